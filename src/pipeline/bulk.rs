//! Bulk Operation Coordinator
//!
//! Fans a remediation action out over many threats, one task per id, and
//! waits for every task to settle. A failing item never stops the others
//! and successful items are not rolled back.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::models::{BulkAction, BulkFailure, BulkOperationResult, ThreatId};
use crate::store::ThreatRegistry;

#[derive(Clone)]
pub struct BulkCoordinator {
    threats: Arc<ThreatRegistry>,
}

impl BulkCoordinator {
    pub fn new(threats: Arc<ThreatRegistry>) -> Self {
        Self { threats }
    }

    pub async fn apply_bulk(
        &self,
        action: BulkAction,
        threat_ids: &[ThreatId],
    ) -> CoreResult<BulkOperationResult> {
        if threat_ids.is_empty() {
            return Err(CoreError::EmptySelection);
        }

        let mut seen = HashSet::new();
        let requested: Vec<ThreatId> = threat_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let tasks: Vec<_> = requested
            .iter()
            .map(|&id| {
                let threats = self.threats.clone();
                let handle = tokio::spawn(async move { threats.apply_action(id, action.into()) });
                (id, handle)
            })
            .collect();

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (id, handle) in tasks {
            match handle.await {
                Ok(Ok(_)) => succeeded.push(id),
                Ok(Err(e)) => failed.push(BulkFailure {
                    threat_id: id,
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }),
                Err(join_err) => failed.push(BulkFailure {
                    threat_id: id,
                    kind: "execution_error".to_string(),
                    reason: join_err.to_string(),
                }),
            }
        }

        tracing::info!(
            action = ?action,
            requested = requested.len(),
            succeeded = succeeded.len(),
            failed = failed.len(),
            "Bulk remediation settled"
        );

        Ok(BulkOperationResult {
            action,
            requested,
            succeeded,
            failed,
        })
    }
}
