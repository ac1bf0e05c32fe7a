//! Alert model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobId;
use super::threat::{Severity, Threat, ThreatId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub job_id: JobId,
    pub threat_id: ThreatId,
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Alert raised when a job records a HIGH or CRITICAL threat.
    pub fn for_threat(user_id: Option<Uuid>, threat: &Threat) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_id: threat.source_job_id,
            threat_id: threat.id,
            alert_type: "threat_detected".to_string(),
            severity: threat.severity,
            message: format!(
                "{} threat detected in {} ({:.0}% confidence)",
                threat.severity,
                threat.file_name,
                threat.confidence * 100.0
            ),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertList {
    pub unread_count: usize,
    pub alerts: Vec<Alert>,
}
