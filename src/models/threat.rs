//! Threat model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::job::JobId;

pub type ThreatId = Uuid;

/// Ordered threat severity (LOW < MEDIUM < HIGH < CRITICAL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Findings at this level or above are recorded as threats.
    pub fn is_actionable(&self) -> bool {
        *self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediationState {
    Active,
    Quarantined,
    FalsePositiveReported,
}

impl RemediationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Quarantined => "QUARANTINED",
            Self::FalsePositiveReported => "FALSE_POSITIVE_REPORTED",
        }
    }

    /// State reached by applying `action`, or `None` when the action is not
    /// allowed from here.
    pub fn after(&self, action: RemediationAction) -> Option<RemediationState> {
        match (self, action) {
            (Self::Active, RemediationAction::Quarantine) => Some(Self::Quarantined),
            (Self::Quarantined, RemediationAction::Restore) => Some(Self::Active),
            (Self::Active | Self::Quarantined, RemediationAction::ReportFalsePositive) => {
                Some(Self::FalsePositiveReported)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for RemediationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    Quarantine,
    Restore,
    ReportFalsePositive,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quarantine => "quarantine",
            Self::Restore => "restore",
            Self::ReportFalsePositive => "report false positive for",
        }
    }
}

/// Actions accepted by the bulk endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Quarantine,
    Restore,
}

impl From<BulkAction> for RemediationAction {
    fn from(action: BulkAction) -> Self {
        match action {
            BulkAction::Quarantine => RemediationAction::Quarantine,
            BulkAction::Restore => RemediationAction::Restore,
        }
    }
}

/// A single finding reported by the analysis routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub subject_path: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default = "default_threat_type")]
    pub threat_type: String,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default)]
    pub file_hash: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

fn default_threat_type() -> String {
    "ransomware_indicator".to_string()
}

impl Finding {
    pub fn new(subject_path: impl Into<String>, severity: Severity, confidence: f64) -> Self {
        Self {
            subject_path: subject_path.into(),
            file_name: None,
            threat_type: default_threat_type(),
            severity,
            confidence,
            file_hash: None,
            file_size: None,
            risk_factors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: ThreatId,
    pub source_job_id: JobId,
    /// Submitter of the source job, when known
    pub submitted_by: Option<Uuid>,
    pub subject_path: String,
    pub file_name: String,
    pub threat_type: String,
    pub severity: Severity,
    pub confidence: f64,
    pub file_hash: Option<String>,
    pub file_size: Option<u64>,
    pub risk_factors: Vec<String>,
    pub remediation_state: RemediationState,
    pub false_positive_reason: Option<String>,
    pub quarantined_at: Option<DateTime<Utc>>,
    pub detected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Threat {
    pub fn from_finding(source_job_id: JobId, submitted_by: Option<Uuid>, finding: Finding) -> Self {
        let now = Utc::now();
        let file_name = finding
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| basename(&finding.subject_path).to_string());

        Self {
            id: Uuid::new_v4(),
            source_job_id,
            submitted_by,
            subject_path: finding.subject_path,
            file_name,
            threat_type: finding.threat_type,
            severity: finding.severity,
            confidence: finding.confidence,
            file_hash: finding.file_hash,
            file_size: finding.file_size,
            risk_factors: finding.risk_factors,
            remediation_state: RemediationState::Active,
            false_positive_reason: None,
            quarantined_at: None,
            detected_at: now,
            updated_at: now,
        }
    }
}

/// Last path component, accepting both `/` and `\` separators.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(path)
}

/// Conjunctive threat filter; unset fields match everything. Unknown query
/// keys are rejected rather than ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreatFilter {
    pub severity: Option<Severity>,
    #[serde(alias = "state")]
    pub remediation_state: Option<RemediationState>,
    pub path: Option<String>,
    #[serde(alias = "from")]
    pub detected_from: Option<DateTime<Utc>>,
    #[serde(alias = "to")]
    pub detected_to: Option<DateTime<Utc>>,
    pub submitted_by: Option<Uuid>,
}

impl ThreatFilter {
    pub fn matches(&self, threat: &Threat) -> bool {
        if self.severity.is_some_and(|s| s != threat.severity) {
            return false;
        }
        if self.remediation_state.is_some_and(|s| s != threat.remediation_state) {
            return false;
        }
        if let Some(needle) = self.path.as_deref().filter(|p| !p.is_empty()) {
            if !threat.subject_path.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.detected_from.is_some_and(|from| threat.detected_at < from) {
            return false;
        }
        if self.detected_to.is_some_and(|to| threat.detected_at > to) {
            return false;
        }
        if self.submitted_by.is_some_and(|user| threat.submitted_by != Some(user)) {
            return false;
        }
        true
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FalsePositiveRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub threat_ids: Vec<ThreatId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    pub threat_id: ThreatId,
    pub kind: String,
    pub reason: String,
}

/// Per-invocation outcome of a bulk remediation; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOperationResult {
    pub action: BulkAction,
    pub requested: Vec<ThreatId>,
    pub succeeded: Vec<ThreatId>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOperationResult {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }

    pub fn failure_for(&self, id: ThreatId) -> Option<&BulkFailure> {
        self.failed.iter().find(|f| f.threat_id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub active: usize,
    pub quarantined: usize,
    pub false_positive_reported: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatStats {
    pub total: usize,
    pub by_severity: SeverityCounts,
    /// Severity counts over threats still ACTIVE
    pub active_by_severity: SeverityCounts,
    pub by_state: StateCounts,
    /// Detections per day, oldest first
    pub daily: Vec<DailyCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert!(!Severity::Medium.is_actionable());
        assert!(Severity::High.is_actionable());
        assert!(Severity::Critical.is_actionable());
    }

    #[test]
    fn test_remediation_transitions() {
        use RemediationAction::*;
        use RemediationState::*;

        assert_eq!(Active.after(Quarantine), Some(Quarantined));
        assert_eq!(Quarantined.after(Restore), Some(Active));
        assert_eq!(Active.after(Restore), None);
        assert_eq!(Quarantined.after(Quarantine), None);
        assert_eq!(Active.after(ReportFalsePositive), Some(FalsePositiveReported));
        assert_eq!(Quarantined.after(ReportFalsePositive), Some(FalsePositiveReported));

        for action in [Quarantine, Restore, ReportFalsePositive] {
            assert_eq!(FalsePositiveReported.after(action), None);
        }
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/home/a/invoice.exe"), "invoice.exe");
        assert_eq!(basename("C:\\Users\\a\\setup.bin"), "setup.bin");
        assert_eq!(basename("invoice.exe"), "invoice.exe");
        assert_eq!(basename("/tmp/dir/"), "dir");
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let mut finding = Finding::new("/home/alice/Downloads/Invoice.exe", Severity::Critical, 0.9);
        finding.file_size = Some(10);
        let threat = Threat::from_finding(Uuid::new_v4(), None, finding);

        assert!(ThreatFilter::default().matches(&threat));

        let by_path = ThreatFilter { path: Some("invoice".into()), ..Default::default() };
        assert!(by_path.matches(&threat));

        let mismatched = ThreatFilter {
            path: Some("invoice".into()),
            severity: Some(Severity::High),
            ..Default::default()
        };
        assert!(!mismatched.matches(&threat));

        let future = ThreatFilter { detected_from: Some(Utc::now() + chrono::Duration::hours(1)), ..Default::default() };
        assert!(!future.matches(&threat));

        let someone_else = ThreatFilter { submitted_by: Some(Uuid::new_v4()), ..Default::default() };
        assert!(!someone_else.matches(&threat));
    }

    #[test]
    fn test_filter_query_names() {
        let filter: ThreatFilter = serde_json::from_str(
            r#"{"remediation_state":"QUARANTINED","detected_from":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(filter.remediation_state, Some(RemediationState::Quarantined));
        assert!(filter.detected_from.is_some());

        let short: ThreatFilter = serde_json::from_str(r#"{"state":"ACTIVE"}"#).unwrap();
        assert_eq!(short.remediation_state, Some(RemediationState::Active));

        assert!(serde_json::from_str::<ThreatFilter>(r#"{"remediaton_state":"ACTIVE"}"#).is_err());
    }

    #[test]
    fn test_finding_defaults_from_json() {
        let finding: Finding = serde_json::from_str(
            r#"{"subject_path":"/tmp/x.locked","severity":"HIGH","confidence":0.8}"#,
        )
        .unwrap();
        assert_eq!(finding.threat_type, "ransomware_indicator");
        assert!(finding.risk_factors.is_empty());
    }
}
