//! Status poller
//!
//! Client-side helper for observing a job until it reaches a terminal
//! state. Polling is read-only: giving up (timeout or dropping the future)
//! leaves the job exactly as the executor will eventually set it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::config::{Config, POLL_INTERVAL_MAX_MS, POLL_INTERVAL_MIN_MS};
use crate::error::{CoreError, CoreResult};
use crate::models::{Job, JobId, JobStatus};
use crate::store::JobStore;

/// Anything that can answer "what is the job's status now".
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self, job_id: JobId) -> CoreResult<Job>;
}

#[async_trait]
impl JobSource for JobStore {
    async fn fetch(&self, job_id: JobId) -> CoreResult<Job> {
        self.get(job_id)
    }
}

#[async_trait]
impl<T: JobSource + ?Sized> JobSource for Arc<T> {
    async fn fetch(&self, job_id: JobId) -> CoreResult<Job> {
        (**self).fetch(job_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    /// Interval clamped to 1-2s; at least one attempt.
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval: interval.clamp(
                Duration::from_millis(POLL_INTERVAL_MIN_MS),
                Duration::from_millis(POLL_INTERVAL_MAX_MS),
            ),
            max_attempts: max_attempts.max(1),
        }
    }
}

impl From<&Config> for PollPolicy {
    fn from(config: &Config) -> Self {
        Self::new(config.poll_interval(), config.poll_max_attempts)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    #[error("job {job_id} still {last_status} after {attempts} polls")]
    TimedOut {
        job_id: JobId,
        attempts: u32,
        last_status: JobStatus,
    },

    #[error(transparent)]
    Source(#[from] CoreError),
}

pub struct StatusPoller<S> {
    source: S,
    policy: PollPolicy,
}

impl<S: JobSource> StatusPoller<S> {
    /// The policy is normalized, so hand-built policies are safe too.
    pub fn new(source: S, policy: PollPolicy) -> Self {
        Self {
            source,
            policy: PollPolicy::new(policy.interval, policy.max_attempts),
        }
    }

    /// Poll until the job is terminal or attempts run out. The first poll
    /// happens immediately.
    pub async fn wait(&self, job_id: JobId) -> Result<Job, PollError> {
        let mut ticker = tokio::time::interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_status = JobStatus::Pending;
        for attempt in 1..=self.policy.max_attempts {
            ticker.tick().await;

            let job = self.source.fetch(job_id).await?;
            if job.status.is_terminal() {
                tracing::debug!(job_id = %job_id, attempt, status = %job.status, "Poll reached terminal state");
                return Ok(job);
            }
            last_status = job.status;
        }

        Err(PollError::TimedOut {
            job_id,
            attempts: self.policy.max_attempts,
            last_status,
        })
    }
}
