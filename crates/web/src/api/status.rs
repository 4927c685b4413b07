//! Health check endpoint and the shared API error type.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use sitekit_core::errors::{DatabaseError, LocaleError, PasswordError, UserError, ValidationError};

use crate::AppState;

/// Health check response.
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    ok: bool,
    version: String,
}

/// Body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Acknowledgement of an action without a resource to return.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub ok: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            ok: true,
            message: message.to_string(),
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// Liveness check, served without a language prefix.
#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound("page not found".into())
}

// ---------------------------------------------------------------------------
// Shared error type for API handlers
// ---------------------------------------------------------------------------

/// Simple API error type that converts to an Axum response.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { .. } => AppError::NotFound(err.to_string()),
            other => {
                error!(error = %other, "database error while handling request");
                AppError::Internal(format!("database error: {}", other))
            }
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(e) => AppError::BadRequest(e.to_string()),
            UserError::Password(PasswordError::HashFailed(detail)) => {
                error!(detail = %detail, "password hashing failed");
                AppError::Internal("password hashing failed".into())
            }
            UserError::Password(e) => AppError::BadRequest(e.to_string()),
            UserError::Database(e) => e.into(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<LocaleError> for AppError {
    fn from(err: LocaleError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
