//! External analysis routine contract
//!
//! The routine is a black box: it receives a job description and reports
//! progress and a verdict over a channel. It may never finish, may report
//! more than once, or may crash; the executor copes with all three.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{CoreError, CoreResult};
use crate::models::{Finding, Job, JobId, JobKind, JobPayload, JobProgress};

/// Buffered events between a routine and its executor worker.
pub const ROUTINE_EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct RoutineRequest {
    pub job_id: JobId,
    pub kind: JobKind,
    pub payload: JobPayload,
}

impl From<&Job> for RoutineRequest {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
            payload: job.payload.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutineEvent {
    Progress(JobProgress),
    Completed(serde_json::Value),
    Failed(String),
}

/// Sending half handed to a routine. Sends after the executor has stopped
/// listening are silently dropped.
#[derive(Debug, Clone)]
pub struct RoutineEvents {
    tx: mpsc::Sender<RoutineEvent>,
}

impl RoutineEvents {
    pub fn channel() -> (Self, mpsc::Receiver<RoutineEvent>) {
        let (tx, rx) = mpsc::channel(ROUTINE_EVENT_BUFFER);
        (Self { tx }, rx)
    }

    /// Returns false once the executor has stopped listening.
    pub async fn send(&self, event: RoutineEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn progress(&self, progress: JobProgress) -> bool {
        self.send(RoutineEvent::Progress(progress)).await
    }

    pub async fn completed(&self, report: &AnalysisReport) -> bool {
        match serde_json::to_value(report) {
            Ok(value) => self.send(RoutineEvent::Completed(value)).await,
            Err(e) => self.failed(format!("unserializable report: {e}")).await,
        }
    }

    pub async fn failed(&self, reason: impl Into<String>) -> bool {
        self.send(RoutineEvent::Failed(reason.into())).await
    }
}

#[async_trait]
pub trait AnalysisRoutine: Send + Sync {
    /// Run the analysis for `request`, reporting through `events`.
    async fn run(&self, request: RoutineRequest, events: RoutineEvents);
}

/// Structured verdict carried by a `Completed` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub units_scanned: u64,
    pub findings: Vec<Finding>,
}

impl AnalysisReport {
    /// Parse a raw payload, rejecting anything the registry would refuse.
    pub fn parse(payload: &serde_json::Value) -> CoreResult<Self> {
        let report: AnalysisReport = serde_json::from_value(payload.clone())
            .map_err(|e| CoreError::Execution(format!("malformed routine output: {e}")))?;

        for finding in &report.findings {
            if !(0.0..=1.0).contains(&finding.confidence) {
                return Err(CoreError::Execution(format!(
                    "malformed routine output: confidence {} outside [0, 1]",
                    finding.confidence
                )));
            }
            if finding.subject_path.trim().is_empty() {
                return Err(CoreError::Execution(
                    "malformed routine output: finding without subject_path".to_string(),
                ));
            }
        }

        Ok(report)
    }

    pub fn actionable(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity.is_actionable())
    }
}
