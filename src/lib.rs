//! ScanGuard Server
//!
//! Analysis job pipeline and threat lifecycle for the security dashboard.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        SCANGUARD SERVER                       │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   submit   ┌───────────┐  events ┌──────────┐  │
//! │  │  API      │ ─────────▶ │ Executor  │ ◀────── │ Analysis │  │
//! │  │  (Axum)   │            │ (1 task   │         │ Routine  │  │
//! │  └─────┬─────┘            │  per job) │         └──────────┘  │
//! │        │ get / remediate  └─────┬─────┘                       │
//! │        ▼                        ▼                             │
//! │  ┌───────────┐  ┌────────────────┐  ┌────────────┐            │
//! │  │ Job Store │  │ Threat Registry│◀─│   Bulk     │            │
//! │  └───────────┘  └────────────────┘  │Coordinator │            │
//! │                                      └────────────┘           │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod store;
pub mod pipeline;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult, CoreError, CoreResult};

use config::Config;
use pipeline::{AnalysisRoutine, BulkCoordinator, Executor};
use store::{AlertFeed, JobStore, ThreatRegistry};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobStore>,
    pub threats: Arc<ThreatRegistry>,
    pub alerts: Arc<AlertFeed>,
    pub executor: Executor,
    pub bulk: BulkCoordinator,
    pub config: Config,
}

impl AppState {
    /// Wire stores, executor and bulk coordinator around `routine`.
    pub fn new(config: Config, routine: Arc<dyn AnalysisRoutine>) -> Self {
        let jobs = Arc::new(JobStore::new());
        let threats = Arc::new(ThreatRegistry::new());
        let alerts = Arc::new(AlertFeed::new());

        let executor = Executor::new(jobs.clone(), threats.clone(), alerts.clone(), routine);
        let bulk = BulkCoordinator::new(threats.clone());

        Self { jobs, threats, alerts, executor, bulk, config }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check));

    // Identity is optional here; alert handlers demand a user themselves
    let api_routes = Router::new()
        // Jobs
        .route("/api/v1/jobs", post(handlers::jobs::submit).get(handlers::jobs::list))
        .route("/api/v1/jobs/:id", get(handlers::jobs::get))

        // Threats
        .route("/api/v1/threats", get(handlers::threats::list))
        .route("/api/v1/threats/stats", get(handlers::threats::stats))
        .route("/api/v1/threats/bulk", post(handlers::threats::bulk))
        .route("/api/v1/threats/:id", get(handlers::threats::get))
        .route("/api/v1/threats/:id/quarantine", post(handlers::threats::quarantine))
        .route("/api/v1/threats/:id/restore", post(handlers::threats::restore))
        .route("/api/v1/threats/:id/false-positive", post(handlers::threats::report_false_positive))

        // Reports
        .route("/api/v1/reports/summary", get(handlers::reports::summary))

        // Alerts
        .route("/api/v1/alerts", get(handlers::alerts::list))
        .route("/api/v1/alerts/:id/read", post(handlers::alerts::mark_read))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::identify_user
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
