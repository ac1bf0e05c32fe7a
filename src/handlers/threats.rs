//! Threat handlers

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::auth::UserContext;
use crate::models::{
    BulkOperationResult, BulkRequest, FalsePositiveRequest, Threat, ThreatFilter, ThreatStats,
};

/// List threats matching the query filter
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ThreatFilter>,
) -> AppResult<Json<Vec<Threat>>> {
    Ok(Json(state.threats.list(&filter)))
}

/// Get single threat
pub async fn get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Threat>> {
    Ok(Json(state.threats.get(id)?))
}

pub async fn quarantine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Threat>> {
    Ok(Json(state.threats.quarantine(id)?))
}

pub async fn restore(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Threat>> {
    Ok(Json(state.threats.restore(id)?))
}

pub async fn report_false_positive(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<FalsePositiveRequest>,
) -> AppResult<Json<Threat>> {
    req.validate()?;
    Ok(Json(state.threats.report_false_positive(id, &req.reason)?))
}

/// Apply one action to many threats; per-item failures land in the body
pub async fn bulk(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<BulkRequest>,
) -> AppResult<Json<BulkOperationResult>> {
    let result = state.bulk.apply_bulk(req.action, &req.threat_ids).await?;
    Ok(Json(result))
}

/// Threat counts by severity, state and day; scoped to the caller when
/// a user is identified
pub async fn stats(
    State(state): State<AppState>,
    user: Option<UserContext>,
) -> Json<ThreatStats> {
    Json(state.threats.stats(user.map(|u| u.user_id)))
}
