//! Reports handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use crate::models::{JobStatus, SeverityCounts, StateCounts};

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub total_jobs: usize,
    pub pending_jobs: usize,
    pub running_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub total_threats: usize,
    pub active_threats: SeverityCounts,
    pub remediation: StateCounts,
    pub security_score: f32,
}

/// Generate dashboard summary
pub async fn summary(State(state): State<AppState>) -> Json<SummaryReport> {
    let job_counts = state.jobs.status_counts();
    let count = |status: JobStatus| job_counts.get(&status).copied().unwrap_or(0);

    let stats = state.threats.stats(None);

    Json(SummaryReport {
        total_jobs: job_counts.values().sum(),
        pending_jobs: count(JobStatus::Pending),
        running_jobs: count(JobStatus::Running),
        completed_jobs: count(JobStatus::Completed),
        failed_jobs: count(JobStatus::Failed),
        total_threats: stats.total,
        security_score: security_score(&stats.active_by_severity),
        active_threats: stats.active_by_severity,
        remediation: stats.by_state,
    })
}

/// 100 minus a weighted penalty for threats still ACTIVE, floored at 0.
pub fn security_score(active: &SeverityCounts) -> f32 {
    let penalty = (active.critical * 10 + active.high * 5 + active.medium * 2) as f32;
    (100.0 - penalty).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_score() {
        assert_eq!(security_score(&SeverityCounts::default()), 100.0);

        let some = SeverityCounts { low: 4, medium: 1, high: 2, critical: 1 };
        assert_eq!(security_score(&some), 78.0);

        let many = SeverityCounts { critical: 20, ..Default::default() };
        assert_eq!(security_score(&many), 0.0);
    }
}
