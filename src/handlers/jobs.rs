//! Job handlers

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::{AppState, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{Job, JobFilter, JobStatus, SubmitJobRequest, SubmitJobResponse};
use crate::middleware::auth::UserContext;

/// Submit an analysis or scan job. Returns before analysis starts.
pub async fn submit(
    State(state): State<AppState>,
    user: Option<UserContext>,
    ApiJson(req): ApiJson<SubmitJobRequest>,
) -> AppResult<(StatusCode, Json<SubmitJobResponse>)> {
    let submitted_by = user.map(|u| u.user_id);
    let job_id = state.executor.submit(req.kind, req.payload, submitted_by)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            status: JobStatus::Pending,
            poll_interval_ms: state.config.poll_interval_ms,
        }),
    ))
}

/// Current job record
pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Job>> {
    Ok(Json(state.jobs.get(id)?))
}

/// Recent jobs, newest first
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<JobFilter>,
) -> AppResult<Json<Vec<Job>>> {
    Ok(Json(state.jobs.list(&filter)))
}
