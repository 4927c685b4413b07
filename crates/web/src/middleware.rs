//! Request guards applied to every route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::api::status::AppError;
use crate::AppState;

/// Reject requests whose `Host` is not listed in `server.allowed_hosts`.
pub async fn allowed_hosts(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let server = &state.config.server;
    let allowed = server.allowed_hosts.iter().any(|h| h == "*") || {
        request_host(&req).is_some_and(|host| server.host_allowed(host))
    };

    if allowed {
        return next.run(req).await;
    }

    warn!(
        host = request_host(&req).unwrap_or("<missing>"),
        path = %req.uri().path(),
        "rejected request for disallowed host"
    );
    AppError::BadRequest("invalid Host header".into()).into_response()
}

fn request_host(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
}
