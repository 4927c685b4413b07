//! Authentication endpoints (email/password login, signed session tokens).
//!
//! A session token is `<session id>.<hex HMAC-SHA256 of the id>`, keyed
//! with the site secret. Clients present it either as a bearer token or as
//! the `sessionid` cookie set at login, so browser pages such as the API
//! docs work without extra headers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use sitekit_core::users::User;

use crate::api::status::{AppError, ErrorResponse, MessageResponse};
use crate::locale::cookie_value;
use crate::{run_blocking, AppState, Session};

/// Upper bound on session lifetime (ten years).
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 10;

/// Cookie carrying the session token for browser requests.
pub const SESSION_COOKIE: &str = "sessionid";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    token: String,
    expires_at: String,
    user: SessionUser,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    expires_at: String,
    user: SessionUser,
}

#[derive(Serialize, ToSchema)]
pub struct SessionUser {
    id: String,
    email: String,
    full_name: String,
    is_staff: bool,
    is_superuser: bool,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            full_name: user.full_name(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:lang/login", post(login))
        .route("/:lang/logout", post(logout))
        .route("/:lang/session", get(session))
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/{lang}/login",
    tag = "auth",
    params(("lang" = String, Path, description = "Language prefix")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened; also set as the `sessionid` cookie", body = LoginResponse),
        (status = 401, description = "Unknown email, wrong password or inactive account", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<([(HeaderName, HeaderValue); 1], Json<LoginResponse>), AppError> {
    let user = run_blocking(&state, move |state| {
        Ok(state.users().authenticate(&body.email, &body.password)?)
    })
    .await?
    .ok_or_else(|| AppError::Unauthorized("invalid email or password".into()))?;

    let session_id = Uuid::new_v4().simple().to_string();
    let ttl_hours = state.config.auth.session_ttl_hours.min(MAX_SESSION_TTL_HOURS);
    let expires_at = Utc::now() + Duration::hours(ttl_hours as i64);
    let token = sign_session(&state.session_key, &session_id)?;

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(
            session_id,
            Session {
                user_id: user.id,
                expires_at,
            },
        );
    }
    info!(user_id = %user.id, "session opened");

    let cookie = session_cookie(&token, ttl_hours * 60 * 60)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            expires_at: state.local_time(expires_at),
            user: SessionUser::from(&user),
        }),
    ))
}

/// Close the current session.
#[utoipa::path(
    post,
    path = "/{lang}/logout",
    tag = "auth",
    params(("lang" = String, Path, description = "Language prefix")),
    responses(
        (status = 200, description = "Session closed and cookie cleared", body = MessageResponse),
        (status = 401, description = "No session token", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<([(HeaderName, HeaderValue); 1], Json<MessageResponse>), AppError> {
    let token = session_token(&headers)?;
    if let Some(session_id) = verify_session(&state.session_key, token) {
        let removed = state.sessions.write().await.remove(session_id);
        if let Some(session) = removed {
            info!(user_id = %session.user_id, "session closed");
        }
    }

    let cookie = session_cookie("", 0)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("logged out")),
    ))
}

/// The current session and its user.
#[utoipa::path(
    get,
    path = "/{lang}/session",
    tag = "auth",
    params(("lang" = String, Path, description = "Language prefix")),
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing, expired or invalid session", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let (user, session) = authenticated_session(&state, &headers).await?;
    Ok(Json(SessionResponse {
        expires_at: state.local_time(session.expires_at),
        user: SessionUser::from(&user),
    }))
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn session_mac(key: &[u8], session_id: &str) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
    mac.update(session_id.as_bytes());
    Some(mac)
}

/// `<id>.<signature>` for a session id.
pub fn sign_session(key: &[u8], session_id: &str) -> Result<String, AppError> {
    let mac = session_mac(key, session_id)
        .ok_or_else(|| AppError::Internal("session key rejected by HMAC".into()))?;
    let signature = mac.finalize().into_bytes();
    Ok(format!("{}.{}", session_id, hex::encode(signature)))
}

/// The session id of a token whose signature checks out.
pub fn verify_session<'a>(key: &[u8], token: &'a str) -> Option<&'a str> {
    let (session_id, signature) = token.split_once('.')?;
    let expected = hex::decode(signature).ok()?;
    session_mac(key, session_id)?
        .verify_slice(&expected)
        .ok()
        .map(|_| session_id)
}

fn session_cookie(token: &str, max_age_secs: u64) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    ))
    .map_err(|_| AppError::Internal("session cookie is not a valid header".into()))
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

/// The session token from the Authorization header, else the session cookie.
fn session_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".into()))
}

/// Resolve the session a request carries to an active user.
///
/// Also opportunistically prunes expired sessions to prevent unbounded growth.
async fn authenticated_session(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<(User, Session), AppError> {
    let token = session_token(headers)?;
    let session_id = verify_session(&state.session_key, token).ok_or_else(|| {
        debug!("session token signature mismatch");
        AppError::Unauthorized("session expired or invalid".into())
    })?;
    let now = Utc::now();

    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.get(session_id).cloned()
    }
    .ok_or_else(|| AppError::Unauthorized("session expired or invalid".into()))?;

    let user_id = session.user_id;
    let user = run_blocking(state, move |state| Ok(state.users().get(user_id)?))
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            debug!(user_id = %user_id, "session user missing or inactive");
            AppError::Unauthorized("session expired or invalid".into())
        })?;

    Ok((user, session))
}

/// The logged-in user, or `401`.
pub async fn require_login(state: &Arc<AppState>, headers: &HeaderMap) -> Result<User, AppError> {
    authenticated_session(state, headers).await.map(|(user, _)| user)
}

/// The logged-in staff user, or `401`/`403`.
pub async fn require_staff(state: &Arc<AppState>, headers: &HeaderMap) -> Result<User, AppError> {
    let user = require_login(state, headers).await?;
    if !user.is_staff {
        return Err(AppError::Forbidden("staff access required".into()));
    }
    Ok(user)
}
