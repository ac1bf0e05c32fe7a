//! Alert feed for HIGH/CRITICAL detections.

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{Alert, AlertFilter, Threat};

#[derive(Default)]
pub struct AlertFeed {
    alerts: RwLock<Vec<Alert>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, user_id: Option<Uuid>, threat: &Threat) -> Alert {
        let alert = Alert::for_threat(user_id, threat);
        tracing::info!(alert_id = %alert.id, threat_id = %threat.id, "Alert raised: {}", alert.message);
        self.alerts.write().push(alert.clone());
        alert
    }

    /// Alerts addressed to `user_id`, newest first.
    pub fn list(&self, user_id: Uuid, filter: &AlertFilter) -> Vec<Alert> {
        self.alerts
            .read()
            .iter()
            .rev()
            .filter(|a| a.user_id == Some(user_id))
            .filter(|a| !filter.unread_only || !a.is_read)
            .cloned()
            .collect()
    }

    pub fn unread_count(&self, user_id: Uuid) -> usize {
        self.alerts
            .read()
            .iter()
            .filter(|a| a.user_id == Some(user_id) && !a.is_read)
            .count()
    }

    /// Idempotent; alerts owned by someone else read as not found.
    pub fn mark_read(&self, user_id: Uuid, alert_id: Uuid) -> CoreResult<Alert> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == alert_id && a.user_id == Some(user_id))
            .ok_or(CoreError::NotFound { entity: "alert", id: alert_id })?;

        alert.is_read = true;
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Finding, Severity};

    fn threat() -> Threat {
        Threat::from_finding(Uuid::new_v4(), None, Finding::new("/tmp/invoice.exe", Severity::Critical, 0.92))
    }

    #[test]
    fn test_alerts_are_scoped_to_user() {
        let feed = AlertFeed::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let alert = feed.raise(Some(alice), &threat());
        feed.raise(None, &threat());

        assert_eq!(feed.list(alice, &AlertFilter::default()).len(), 1);
        assert!(feed.list(bob, &AlertFilter::default()).is_empty());
        assert!(alert.message.contains("CRITICAL"));
        assert!(alert.message.contains("invoice.exe"));
        assert!(alert.message.contains("92%"));
    }

    #[test]
    fn test_mark_read() {
        let feed = AlertFeed::new();
        let alice = Uuid::new_v4();
        let alert = feed.raise(Some(alice), &threat());
        assert_eq!(feed.unread_count(alice), 1);

        assert!(feed.mark_read(Uuid::new_v4(), alert.id).is_err());
        assert!(feed.mark_read(alice, alert.id).unwrap().is_read);
        assert!(feed.mark_read(alice, alert.id).unwrap().is_read);

        assert_eq!(feed.unread_count(alice), 0);
        assert!(feed.list(alice, &AlertFilter { unread_only: true }).is_empty());
    }
}
