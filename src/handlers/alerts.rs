//! Alerts handlers

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::{AppState, AppResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::models::{Alert, AlertFilter, AlertList};
use crate::middleware::auth::UserContext;

/// Alerts for the authenticated user
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    ApiQuery(filter): ApiQuery<AlertFilter>,
) -> AppResult<Json<AlertList>> {
    Ok(Json(AlertList {
        unread_count: state.alerts.unread_count(user.user_id),
        alerts: state.alerts.list(user.user_id, &filter),
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: UserContext,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Alert>> {
    Ok(Json(state.alerts.mark_read(user.user_id, id)?))
}
