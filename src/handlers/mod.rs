//! HTTP handlers

pub mod health;
pub mod jobs;
pub mod threats;
pub mod reports;
pub mod alerts;
