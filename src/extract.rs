//! Request extractors
//!
//! axum's stock extractors reject with plain-text bodies. These wrappers
//! route every rejection through `AppError`, so malformed input comes back
//! as a 400 `validation_error` in the usual JSON shape.

use axum::extract::{FromRequest, FromRequestParts};

use crate::AppError;

/// JSON body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
