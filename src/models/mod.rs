//! Data models

pub mod job;
pub mod threat;
pub mod alert;

pub use job::*;
pub use threat::*;
pub use alert::*;
