//! In-memory stores for jobs, threats and alerts

pub mod jobs;
pub mod threats;
pub mod alerts;

pub use jobs::JobStore;
pub use threats::ThreatRegistry;
pub use alerts::AlertFeed;
