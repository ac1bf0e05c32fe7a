//! Threat Registry
//!
//! Owns every recorded threat and its remediation state. Mutations are
//! checked and applied under the threat's own lock, so two callers racing
//! on the same threat see exactly one winner.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{
    DailyCount, Finding, JobId, RemediationAction, RemediationState, SeverityCounts,
    StateCounts, Threat, ThreatFilter, ThreatId, ThreatStats,
};

const STATS_WINDOW_DAYS: i64 = 7;

#[derive(Default)]
struct ThreatIndex {
    by_id: HashMap<ThreatId, Arc<Mutex<Threat>>>,
    /// Detection order
    order: Vec<ThreatId>,
}

#[derive(Default)]
pub struct ThreatRegistry {
    index: RwLock<ThreatIndex>,
}

impl ThreatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding produced by `source_job_id`. New threats start ACTIVE.
    pub fn record_threat(
        &self,
        source_job_id: JobId,
        submitted_by: Option<Uuid>,
        finding: Finding,
    ) -> CoreResult<Threat> {
        validate_finding(&finding)?;

        let threat = Threat::from_finding(source_job_id, submitted_by, finding);
        let snapshot = threat.clone();

        let mut index = self.index.write();
        index.by_id.insert(threat.id, Arc::new(Mutex::new(threat)));
        index.order.push(snapshot.id);

        tracing::warn!(
            threat_id = %snapshot.id,
            job_id = %source_job_id,
            severity = %snapshot.severity,
            "Threat recorded: {}",
            snapshot.subject_path
        );
        Ok(snapshot)
    }

    pub fn get(&self, id: ThreatId) -> CoreResult<Threat> {
        Ok(self.entry(id)?.lock().clone())
    }

    pub fn quarantine(&self, id: ThreatId) -> CoreResult<Threat> {
        self.apply(id, RemediationAction::Quarantine, None)
    }

    pub fn restore(&self, id: ThreatId) -> CoreResult<Threat> {
        self.apply(id, RemediationAction::Restore, None)
    }

    /// Terminal for the threat: later quarantine/restore calls fail.
    pub fn report_false_positive(&self, id: ThreatId, reason: &str) -> CoreResult<Threat> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::Validation("false positive reason must not be empty".to_string()));
        }
        self.apply(id, RemediationAction::ReportFalsePositive, Some(reason.to_string()))
    }

    /// Single entry point for remediation, shared with the bulk coordinator.
    pub fn apply_action(&self, id: ThreatId, action: RemediationAction) -> CoreResult<Threat> {
        match action {
            RemediationAction::ReportFalsePositive => Err(CoreError::Validation(
                "false positive reports require a reason".to_string(),
            )),
            other => self.apply(id, other, None),
        }
    }

    /// Threats matching `filter`, most recent first.
    pub fn list(&self, filter: &ThreatFilter) -> Vec<Threat> {
        let index = self.index.read();
        index
            .order
            .iter()
            .rev()
            .filter_map(|id| index.by_id.get(id))
            .map(|entry| entry.lock().clone())
            .filter(|threat| filter.matches(threat))
            .collect()
    }

    /// Counts over every threat, or only those from `submitted_by`'s jobs.
    pub fn stats(&self, submitted_by: Option<Uuid>) -> ThreatStats {
        let threats = self.list(&ThreatFilter { submitted_by, ..Default::default() });
        let today = Utc::now().date_naive();
        let window_start = today - Duration::days(STATS_WINDOW_DAYS - 1);

        let mut by_severity = SeverityCounts::default();
        let mut active_by_severity = SeverityCounts::default();
        let mut by_state = StateCounts::default();
        let mut per_day: HashMap<_, usize> = HashMap::new();

        for threat in &threats {
            by_severity.add(threat.severity);
            match threat.remediation_state {
                RemediationState::Active => {
                    by_state.active += 1;
                    active_by_severity.add(threat.severity);
                }
                RemediationState::Quarantined => by_state.quarantined += 1,
                RemediationState::FalsePositiveReported => by_state.false_positive_reported += 1,
            }

            let day = threat.detected_at.date_naive();
            if day >= window_start {
                *per_day.entry(day).or_insert(0) += 1;
            }
        }

        let daily = (0..STATS_WINDOW_DAYS)
            .map(|offset| window_start + Duration::days(offset))
            .map(|date| DailyCount {
                date,
                count: per_day.get(&date).copied().unwrap_or(0),
            })
            .collect();

        ThreatStats {
            total: threats.len(),
            by_severity,
            active_by_severity,
            by_state,
            daily,
        }
    }

    fn apply(
        &self,
        id: ThreatId,
        action: RemediationAction,
        reason: Option<String>,
    ) -> CoreResult<Threat> {
        let entry = self.entry(id)?;
        let mut threat = entry.lock();

        let from = threat.remediation_state;
        let next = from.after(action).ok_or_else(|| CoreError::InvalidTransition {
            entity: "threat",
            id,
            from: from.to_string(),
            action: action.as_str().to_string(),
        })?;

        let now = Utc::now();
        threat.remediation_state = next;
        threat.updated_at = now;
        match next {
            RemediationState::Quarantined => threat.quarantined_at = Some(now),
            RemediationState::Active => threat.quarantined_at = None,
            RemediationState::FalsePositiveReported => threat.false_positive_reason = reason,
        }

        tracing::info!(threat_id = %id, from = %from, to = %next, "Threat remediation updated");
        Ok(threat.clone())
    }

    fn entry(&self, id: ThreatId) -> CoreResult<Arc<Mutex<Threat>>> {
        self.index
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound { entity: "threat", id })
    }
}

fn validate_finding(finding: &Finding) -> CoreResult<()> {
    if finding.subject_path.trim().is_empty() {
        return Err(CoreError::Validation("finding has an empty subject_path".to_string()));
    }
    if !(0.0..=1.0).contains(&finding.confidence) {
        return Err(CoreError::Validation(format!(
            "confidence {} outside [0, 1]",
            finding.confidence
        )));
    }
    Ok(())
}
