//! SiteKit web server and JSON API.
//!
//! Provides an Axum-based HTTP server with:
//! - Locale-prefixed routing (`/{lang}/...`) with redirects for bare paths
//! - Login sessions and a staff-only admin API for users and groups
//! - Language listing and switching endpoints
//! - OpenAPI schema plus Swagger UI / ReDoc pages
//! - Static and media file serving in debug mode

pub mod api;
pub mod locale;
pub mod middleware;

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::Rng;
use tokio::sync::RwLock;
use tower::util::BoxCloneService;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use sitekit_core::config::AppConfig;
use sitekit_core::db::Database;
use sitekit_core::errors::CoreError;
use sitekit_core::i18n::LocaleSet;
use sitekit_core::users::{BcryptHasher, PasswordHasher, PasswordPolicy, UserManager};

use crate::api::status::AppError;

/// A logged-in session.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub locales: LocaleSet,
    /// Zone timestamps are rendered in.
    pub time_zone: Tz,
    pub hasher: Arc<dyn PasswordHasher>,
    pub policy: PasswordPolicy,
    /// HMAC key session tokens are signed with.
    pub session_key: Vec<u8>,
    /// Active sessions (session id -> session).
    pub sessions: RwLock<HashMap<String, Session>>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database) -> Result<Self, CoreError> {
        let locales = LocaleSet::from_config(&config.i18n)?;
        let time_zone = config.i18n.tz()?;
        let hasher = Arc::new(BcryptHasher::new(config.auth.bcrypt_cost));
        let policy = PasswordPolicy::from_config(&config.auth);
        let session_key = match &config.server.secret_key {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                warn!("no secret key configured, sessions will not survive a restart");
                rand::thread_rng().gen::<[u8; 32]>().to_vec()
            }
        };
        Ok(Self {
            config,
            db,
            locales,
            time_zone,
            hasher,
            policy,
            session_key,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Identity manager over the site database.
    pub fn users(&self) -> UserManager<'_, Database> {
        UserManager::new(&self.db, self.hasher.as_ref())
    }

    /// A timestamp in the site time zone, as RFC 3339.
    pub fn local_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.time_zone).to_rfc3339()
    }
}

/// Run `f` on the blocking thread pool.
///
/// Password hashing and SQLite access block; handlers that do either hand
/// the work over here instead of stalling a runtime worker.
pub async fn run_blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, AppError>
where
    F: FnOnce(&AppState) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))?
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server over an initialized database.
    pub fn new(config: AppConfig, db: Database) -> Result<Self, CoreError> {
        Ok(Self {
            state: Arc::new(AppState::new(config, db)?),
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the full application router with all middleware applied.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        let config = &state.config;

        let mut app = Router::new()
            .merge(api::status::routes())
            .merge(api::admin::routes())
            .merge(api::auth::routes())
            .merge(api::users::routes())
            .merge(api::groups::routes())
            .merge(api::i18n::routes())
            .merge(api::docs::routes());

        if config.server.debug {
            let files = &config.static_files;
            let static_dirs: Vec<PathBuf> = std::iter::once(files.static_root.clone())
                .chain(files.static_dirs.iter().cloned())
                .collect();
            app = app
                .nest_service(mount_point(&files.static_url), file_service(&static_dirs))
                .nest_service(
                    mount_point(&files.media_url),
                    file_service(std::slice::from_ref(&files.media_root)),
                );
        }

        let mut app = app
            .fallback(api::status::not_found)
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                locale::locale_middleware,
            ))
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::allowed_hosts,
            ));

        for (name, value) in security_headers(config) {
            app = app.layer(SetResponseHeaderLayer::if_not_present(name, value));
        }

        app.layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB max request body
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(config))
            .with_state(state)
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = self.router();

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// `/static/` -> `/static`, as `nest_service` expects.
fn mount_point(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

type FileService = BoxCloneService<Request, Response, Infallible>;

/// Serve files from `dirs`, trying each directory in order.
fn file_service(dirs: &[PathBuf]) -> FileService {
    let mut service: Option<FileService> = None;
    for dir in dirs.iter().rev() {
        let serve = ServeDir::new(dir);
        service = Some(match service {
            None => BoxCloneService::new(
                ServiceExt::<Request>::map_response(serve, |res| res.into_response()),
            ),
            Some(next) => BoxCloneService::new(
                ServiceExt::<Request>::map_response(serve.fallback(next), |res| {
                    res.into_response()
                }),
            ),
        });
    }
    service.unwrap_or_else(|| {
        BoxCloneService::new(tower::service_fn(|_req: Request| async {
            Ok::<_, Infallible>(AppError::NotFound("file not found".into()).into_response())
        }))
    })
}

fn security_headers(config: &AppConfig) -> Vec<(header::HeaderName, HeaderValue)> {
    let security = &config.security;
    let mut headers = Vec::new();

    match HeaderValue::from_str(&security.x_frame_options) {
        Ok(v) => headers.push((header::X_FRAME_OPTIONS, v)),
        Err(_) => warn!(value = %security.x_frame_options, "invalid X-Frame-Options value, header not sent"),
    }
    if security.content_type_nosniff {
        headers.push((
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));
    }
    match HeaderValue::from_str(&security.referrer_policy) {
        Ok(v) => headers.push((header::REFERRER_POLICY, v)),
        Err(_) => warn!(value = %security.referrer_policy, "invalid Referrer-Policy value, header not sent"),
    }
    headers
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.cors.allowed_origins;
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect::<Vec<_>>(),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT_LANGUAGE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_point() {
        assert_eq!(mount_point("/static/"), "/static");
        assert_eq!(mount_point("/media"), "/media");
    }

    #[test]
    fn test_security_headers_skip_invalid_values() {
        let mut config = AppConfig::default();
        config.security.x_frame_options = "bad\nvalue".into();
        let names: Vec<_> = security_headers(&config).into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![header::X_CONTENT_TYPE_OPTIONS, header::REFERRER_POLICY]
        );
    }
}
