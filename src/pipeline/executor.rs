//! Job Executor
//!
//! One worker task per job. The worker is the only writer of the job's
//! status, progress and terminal fields; the routine talks to it over a
//! channel and never touches the store.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use super::routine::{AnalysisReport, AnalysisRoutine, RoutineEvent, RoutineEvents, RoutineRequest};
use crate::error::CoreResult;
use crate::models::{Job, JobId, JobKind, JobPatch, JobPayload, JobProgress, JobStatus};
use crate::store::{AlertFeed, JobStore, ThreatRegistry};

const EXITED_WITHOUT_RESULT: &str = "analysis routine exited without reporting a result";

#[derive(Clone)]
pub struct Executor {
    jobs: Arc<JobStore>,
    threats: Arc<ThreatRegistry>,
    alerts: Arc<AlertFeed>,
    routine: Arc<dyn AnalysisRoutine>,
}

impl Executor {
    pub fn new(
        jobs: Arc<JobStore>,
        threats: Arc<ThreatRegistry>,
        alerts: Arc<AlertFeed>,
        routine: Arc<dyn AnalysisRoutine>,
    ) -> Self {
        Self { jobs, threats, alerts, routine }
    }

    /// Record the job and hand it to a worker. Returns as soon as the
    /// record exists.
    pub fn submit(
        &self,
        kind: JobKind,
        payload: JobPayload,
        submitted_by: Option<Uuid>,
    ) -> CoreResult<JobId> {
        let id = self.jobs.submit(kind, payload, submitted_by)?;
        self.dispatch(id);
        Ok(id)
    }

    /// Spawn the worker for an already-submitted job. Call once per job.
    pub fn dispatch(&self, job_id: JobId) -> JoinHandle<()> {
        let worker = JobWorker {
            job_id,
            jobs: self.jobs.clone(),
            threats: self.threats.clone(),
            alerts: self.alerts.clone(),
            routine: self.routine.clone(),
        };
        let span = tracing::info_span!("job", job_id = %job_id);
        tokio::spawn(worker.run().instrument(span))
    }
}

struct JobWorker {
    job_id: JobId,
    jobs: Arc<JobStore>,
    threats: Arc<ThreatRegistry>,
    alerts: Arc<AlertFeed>,
    routine: Arc<dyn AnalysisRoutine>,
}

impl JobWorker {
    async fn run(self) {
        let job = match self.jobs.transition(self.job_id, JobStatus::Running, JobPatch::default()) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("Job not started: {}", e);
                return;
            }
        };

        let (events, mut rx) = RoutineEvents::channel();
        let routine = self.routine.clone();
        let request = RoutineRequest::from(&job);
        tokio::spawn(async move { routine.run(request, events).await }.in_current_span());

        let outcome = loop {
            match rx.recv().await {
                Some(RoutineEvent::Progress(progress)) => {
                    if let Err(e) = self.jobs.record_progress(self.job_id, progress) {
                        tracing::warn!("Progress dropped: {}", e);
                    }
                }
                Some(RoutineEvent::Completed(payload)) => break self.complete(&job, payload),
                Some(RoutineEvent::Failed(reason)) => break self.fail(reason),
                None => break self.fail(EXITED_WITHOUT_RESULT.to_string()),
            }
        };

        discard_remaining(&mut rx);

        match outcome {
            Ok(job) => tracing::info!(
                status = %job.status,
                findings = job.progress.findings_count,
                "Job finished"
            ),
            Err(e) => tracing::error!("Terminal write rejected: {}", e),
        }
    }

    fn complete(&self, job: &Job, payload: serde_json::Value) -> CoreResult<Job> {
        let report = match AnalysisReport::parse(&payload) {
            Ok(report) => report,
            Err(e) => return self.fail(e.to_string()),
        };

        // Threats land before COMPLETED so pollers never see a finished job
        // whose threats are missing.
        for finding in report.actionable() {
            match self.threats.record_threat(self.job_id, job.submitted_by, finding.clone()) {
                Ok(threat) => {
                    self.alerts.raise(job.submitted_by, &threat);
                }
                Err(e) => tracing::warn!("Finding not recorded: {}", e),
            }
        }

        let current = self.jobs.get(self.job_id)?.progress;
        let final_progress = JobProgress {
            units_processed: report.units_scanned.max(current.units_processed),
            units_total: report.units_scanned.max(current.units_total),
            findings_count: report.findings.len() as u64,
        };
        self.jobs.record_progress(self.job_id, final_progress)?;

        self.jobs
            .transition(self.job_id, JobStatus::Completed, JobPatch::completed(payload))
    }

    fn fail(&self, reason: String) -> CoreResult<Job> {
        tracing::warn!("Job failed: {}", reason);
        self.jobs
            .transition(self.job_id, JobStatus::Failed, JobPatch::failed(reason))
    }
}

/// Drop whatever the routine sent after the terminal event.
fn discard_remaining(rx: &mut mpsc::Receiver<RoutineEvent>) {
    rx.close();
    while let Ok(event) = rx.try_recv() {
        tracing::debug!(?event, "Discarding routine event after terminal state");
    }
}
