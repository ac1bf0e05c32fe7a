//! Authentication middleware
//!
//! Identity is optional: a valid bearer token attaches a `UserContext` to
//! the request, no token means anonymous, and a bad token is rejected.

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, AppError};

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// User context extracted from JWT
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub role: String,
}

/// Middleware: attach the caller's identity when a bearer token is present
pub async fn identify_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = extract_bearer_token(&req)? {
        let token_data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        let claims = token_data.claims;
        let user_ctx = UserContext {
            user_id: Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?,
            role: claims.role,
        };

        tracing::debug!("Request authenticated as {} ({})", user_ctx.user_id, user_ctx.role);
        req.extensions_mut().insert(user_ctx);
    }

    Ok(next.run(req).await)
}

/// Sign a token the middleware will accept. Used for local development.
pub fn issue_token(secret: &str, user_id: Uuid, role: &str, ttl: Duration) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalError(format!("Token signing failed: {}", e)))
}

/// Extract bearer token from Authorization header; `None` when absent
fn extract_bearer_token(req: &Request) -> Result<Option<String>, AppError> {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_header = header.to_str().map_err(|_| AppError::Unauthorized)?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or(AppError::Unauthorized)
}

// Implement FromRequestParts for UserContext
#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
