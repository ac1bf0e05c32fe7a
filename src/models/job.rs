//! Job model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};

pub type JobId = Uuid;

/// What a job asks the analysis routine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    FileAnalysis,
    QuickScan,
    FullScan,
    CustomScan,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileAnalysis => "FILE_ANALYSIS",
            Self::QuickScan => "QUICK_SCAN",
            Self::FullScan => "FULL_SCAN",
            Self::CustomScan => "CUSTOM_SCAN",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle: PENDING -> RUNNING -> {COMPLETED, FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub units_processed: u64,
    pub units_total: u64,
    pub findings_count: u64,
}

/// Submission payload. Which fields are required depends on the job kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobPayload {
    #[validate(length(max = 4096))]
    pub target_path: Option<String>,
    #[validate(length(max = 255))]
    pub file_name: Option<String>,
}

impl JobPayload {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            target_path: Some(path.into()),
            file_name: None,
        }
    }

    pub fn for_file(name: impl Into<String>) -> Self {
        Self {
            target_path: None,
            file_name: Some(name.into()),
        }
    }

    /// Field limits plus the per-kind requirements.
    pub fn validate_for(&self, kind: JobKind) -> CoreResult<()> {
        self.validate()?;

        match kind {
            JobKind::CustomScan if is_blank(&self.target_path) => Err(CoreError::Validation(
                "CUSTOM_SCAN requires a non-empty target_path".to_string(),
            )),
            JobKind::FileAnalysis if is_blank(&self.target_path) && is_blank(&self.file_name) => {
                Err(CoreError::Validation(
                    "FILE_ANALYSIS requires a file_name or target_path".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Name of the artifact this payload points at, for logs and threat records.
    pub fn subject(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.target_path.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub submitted_by: Option<Uuid>,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub progress: JobProgress,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(kind: JobKind, payload: JobPayload, submitted_by: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            submitted_by,
            payload,
            status: JobStatus::Pending,
            progress: JobProgress::default(),
            result: None,
            error: None,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Fields written alongside a status transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl JobPatch {
    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub submitted_by: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitJobRequest {
    pub kind: JobKind,
    #[serde(flatten)]
    pub payload: JobPayload,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub poll_interval_ms: u64,
}
