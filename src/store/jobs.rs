//! Job Store
//!
//! Process-lifetime record of every submitted job. Each record sits behind
//! its own mutex so a status transition is read-checked-written atomically
//! while readers of other jobs proceed untouched.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{Job, JobFilter, JobId, JobKind, JobPatch, JobPayload, JobProgress, JobStatus};

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Default)]
struct JobIndex {
    by_id: HashMap<JobId, Arc<Mutex<Job>>>,
    /// Submission order
    order: Vec<JobId>,
}

#[derive(Default)]
pub struct JobStore {
    index: RwLock<JobIndex>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and record a new job in PENDING. Never waits on analysis.
    pub fn submit(
        &self,
        kind: JobKind,
        payload: JobPayload,
        submitted_by: Option<Uuid>,
    ) -> CoreResult<JobId> {
        payload.validate_for(kind)?;

        let job = Job::new(kind, payload, submitted_by);
        let id = job.id;

        let mut index = self.index.write();
        index.by_id.insert(id, Arc::new(Mutex::new(job)));
        index.order.push(id);

        tracing::info!(job_id = %id, kind = %kind, "Job submitted");
        Ok(id)
    }

    /// Snapshot of the current record.
    pub fn get(&self, id: JobId) -> CoreResult<Job> {
        Ok(self.entry(id)?.lock().clone())
    }

    /// Most recent first.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let index = self.index.read();

        index
            .order
            .iter()
            .rev()
            .filter_map(|id| index.by_id.get(id))
            .map(|entry| entry.lock().clone())
            .filter(|job| filter.submitted_by.map_or(true, |u| job.submitted_by == Some(u)))
            .filter(|job| filter.status.map_or(true, |s| job.status == s))
            .take(limit)
            .collect()
    }

    pub fn status_counts(&self) -> HashMap<JobStatus, usize> {
        let index = self.index.read();
        let mut counts = HashMap::new();
        for entry in index.by_id.values() {
            *counts.entry(entry.lock().status).or_insert(0) += 1;
        }
        counts
    }

    /// Move a job along its state machine. Only the executor calls this.
    pub(crate) fn transition(&self, id: JobId, next: JobStatus, patch: JobPatch) -> CoreResult<Job> {
        let entry = self.entry(id)?;
        let mut job = entry.lock();

        if !job.status.can_transition_to(next) {
            return Err(invalid_transition(&job, format!("move to {next}")));
        }

        match next {
            JobStatus::Completed => {
                let result = patch.result.ok_or_else(|| {
                    CoreError::Validation("COMPLETED requires a result payload".to_string())
                })?;
                job.result = Some(result);
                job.error = None;
                job.completed_at = Some(Utc::now());
            }
            JobStatus::Failed => {
                let reason = patch.error.ok_or_else(|| {
                    CoreError::Validation("FAILED requires an error reason".to_string())
                })?;
                job.error = Some(reason);
                job.result = None;
                job.completed_at = Some(Utc::now());
            }
            JobStatus::Running => {
                job.started_at = Some(Utc::now());
            }
            JobStatus::Pending => unreachable!("no edge leads back to PENDING"),
        }

        let from = job.status;
        job.status = next;
        tracing::debug!(job_id = %id, from = %from, to = %next, "Job transitioned");

        Ok(job.clone())
    }

    /// Overwrite progress counters; only legal while RUNNING.
    pub(crate) fn record_progress(&self, id: JobId, progress: JobProgress) -> CoreResult<()> {
        let entry = self.entry(id)?;
        let mut job = entry.lock();

        if job.status != JobStatus::Running {
            return Err(invalid_transition(&job, "record progress for".to_string()));
        }

        job.progress = progress;
        Ok(())
    }

    fn entry(&self, id: JobId) -> CoreResult<Arc<Mutex<Job>>> {
        self.index
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "job", id })
    }
}

fn invalid_transition(job: &Job, action: String) -> CoreError {
    CoreError::InvalidTransition {
        entity: "job",
        id: job.id,
        from: job.status.to_string(),
        action,
    }
}
