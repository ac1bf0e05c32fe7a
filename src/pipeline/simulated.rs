//! Simulated analysis routine
//!
//! Stand-in for a real scanner/ML service. Walks a fixed number of units
//! per job kind, reporting progress as it goes, and rates artifacts purely
//! by name. Deterministic for a given target.

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::routine::{AnalysisReport, AnalysisRoutine, RoutineEvents, RoutineRequest};
use crate::models::{basename, Finding, JobKind, JobProgress, Severity};

/// Targets containing this marker make the routine report a failure.
pub const FAILURE_MARKER: &str = "__fail__";

const PROGRESS_CHUNK: u64 = 50;

const ENCRYPTED_EXTENSIONS: &[&str] = &[
    ".encrypted", ".locked", ".crypto", ".crypt", ".crypted", ".wncry", ".wcry", ".locky",
    ".zepto", ".dharma", ".onion",
];

const RANSOM_NOTE_PATTERNS: &[&str] = &[
    "how_to_decrypt", "ransom", "restore_files", "decrypt_instructions", "_locked", "readme_for_decrypt",
];

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    ".exe", ".dll", ".bat", ".cmd", ".scr", ".com", ".pif", ".js", ".vbs", ".jar", ".ps1", ".bin",
];

const LURE_WORDS: &[&str] = &["invoice", "payment", "urgent", "receipt", "payroll", "shipping"];

/// Artifacts a simulated scan may come across.
const SCAN_CATALOGUE: &[&str] = &[
    "Downloads/invoice_0921.exe",
    "Documents/quarterly_report.pdf.locked",
    "Desktop/HOW_TO_DECRYPT.txt",
    "Downloads/setup_helper.scr",
    "Pictures/holiday.jpg",
    "Documents/notes.txt",
    "Downloads/payment_receipt.pdf.exe",
    "AppData/update.ps1",
    "Documents/budget.xlsx.wncry",
    "Music/playlist.m3u",
];

pub struct SimulatedRoutine {
    step_delay: Duration,
}

impl SimulatedRoutine {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

#[async_trait]
impl AnalysisRoutine for SimulatedRoutine {
    async fn run(&self, request: RoutineRequest, events: RoutineEvents) {
        let root = scan_root(&request);
        let units_total = units_for(request.kind);

        if root.contains(FAILURE_MARKER) {
            tokio::time::sleep(self.step_delay).await;
            events.failed(format!("analysis engine crashed while reading {root}")).await;
            return;
        }

        let candidates: Vec<String> = match request.kind {
            JobKind::FileAnalysis => vec![root.clone()],
            _ => pick_candidates(&root, request.kind),
        };

        let mut findings = Vec::new();
        let mut processed = 0;
        while processed < units_total {
            tokio::time::sleep(self.step_delay).await;
            processed = (processed + PROGRESS_CHUNK).min(units_total);

            // Reveal candidates proportionally to progress.
            let revealed = candidates.len() * processed as usize / units_total as usize;
            while findings.len() < revealed {
                findings.push(rate(&candidates[findings.len()]));
            }

            let progress = JobProgress {
                units_processed: processed,
                units_total,
                findings_count: findings.iter().flatten().count() as u64,
            };
            if !events.progress(progress).await {
                return;
            }
        }

        let report = AnalysisReport {
            units_scanned: units_total,
            findings: findings.into_iter().flatten().collect(),
        };
        events.completed(&report).await;
    }
}

fn scan_root(request: &RoutineRequest) -> String {
    let default_root = match request.kind {
        JobKind::QuickScan => "~",
        JobKind::FullScan => "/",
        JobKind::CustomScan | JobKind::FileAnalysis => "",
    };
    match request.kind {
        JobKind::FileAnalysis => request.payload.subject().unwrap_or_default().to_string(),
        _ => request
            .payload
            .target_path
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| default_root.to_string()),
    }
}

fn units_for(kind: JobKind) -> u64 {
    match kind {
        JobKind::FileAnalysis => 1,
        JobKind::QuickScan => 100,
        JobKind::CustomScan => 250,
        JobKind::FullScan => 1000,
    }
}

/// Deterministic subset of the catalogue, seeded by the target.
fn pick_candidates(root: &str, kind: JobKind) -> Vec<String> {
    let digest = Sha256::digest(format!("{kind}:{root}").as_bytes());
    let root = root.trim_end_matches('/');

    SCAN_CATALOGUE
        .iter()
        .zip(digest.iter())
        .filter(|(_, byte)| *byte % 2 == 0)
        .map(|(entry, _)| format!("{root}/{entry}"))
        .collect()
}

/// Name-based verdict; `None` for artifacts that look benign.
pub fn rate(path: &str) -> Option<Finding> {
    let name = basename(path).to_lowercase();
    let mut risk_factors = Vec::new();

    let encrypted = ENCRYPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
    let ransom_note = RANSOM_NOTE_PATTERNS.iter().any(|p| name.contains(p));
    let executable = EXECUTABLE_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
    let lure = LURE_WORDS.iter().any(|w| name.contains(w));
    let double_extension = executable && name.trim_end_matches(|c| c != '.').trim_end_matches('.').contains('.');

    if encrypted {
        risk_factors.push("Encrypted-file extension".to_string());
    }
    if ransom_note {
        risk_factors.push("Ransom note filename pattern".to_string());
    }
    if executable {
        risk_factors.push("Executable file type".to_string());
    }
    if executable && lure {
        risk_factors.push("Executable disguised as a document".to_string());
    }
    if double_extension {
        risk_factors.push("Double file extension".to_string());
    }

    let (severity, confidence) = if encrypted {
        (Severity::Critical, 0.95)
    } else if executable && (lure || double_extension) {
        (Severity::Critical, 0.92)
    } else if ransom_note {
        (Severity::High, 0.85)
    } else if executable {
        (Severity::Medium, 0.6)
    } else {
        return None;
    };

    let mut finding = Finding::new(path, severity, confidence);
    finding.file_name = Some(basename(path).to_string());
    finding.file_hash = Some(hex::encode(Sha256::digest(path.as_bytes())));
    finding.risk_factors = risk_factors;
    Some(finding)
}
