//! Locale-prefix routing.
//!
//! Every application route lives under `/{lang}/`. The middleware here
//! records the active locale for prefixed requests and redirects bare paths
//! to the prefix the client prefers: the `lang` cookie first, then
//! `Accept-Language`, then the configured default.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use sitekit_core::i18n::LocaleSet;

use crate::api::status::AppError;
use crate::AppState;

/// Cookie remembering the language a visitor picked.
pub const LANGUAGE_COOKIE: &str = "lang";

/// Locale of the current request, taken from its path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLocale(pub String);

pub async fn locale_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if is_unprefixed_route(&state, &path) {
        return next.run(req).await;
    }

    if let Some(code) = state.locales.locale_of(&path).map(str::to_string) {
        req.extensions_mut().insert(ActiveLocale(code.clone()));
        let mut response = next.run(req).await;
        if let Ok(value) = HeaderValue::from_str(&code) {
            response
                .headers_mut()
                .insert(header::CONTENT_LANGUAGE, value);
        }
        return response;
    }

    // Every application route carries a prefix.
    if !state.config.i18n.prefix_redirect {
        return AppError::NotFound("page not found".into()).into_response();
    }

    let target = preferred_locale(&state.locales, req.headers());
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    match state.locales.switch(path_and_query, &target) {
        Ok(location) => {
            debug!(from = %path, to = %location, "redirecting to locale prefix");
            let mut response = found(&location);
            response.headers_mut().insert(
                header::VARY,
                HeaderValue::from_static("Accept-Language, Cookie"),
            );
            response
        }
        Err(e) => AppError::BadRequest(e.to_string()).into_response(),
    }
}

/// Paths served without a language prefix.
fn is_unprefixed_route(state: &AppState, path: &str) -> bool {
    let files = &state.config.static_files;
    path == "/health"
        || (state.config.server.debug
            && (path.starts_with(&files.static_url) || path.starts_with(&files.media_url)))
}

/// The locale a client prefers among the supported ones.
pub fn preferred_locale(locales: &LocaleSet, headers: &HeaderMap) -> String {
    if let Some(code) = cookie_value(headers, LANGUAGE_COOKIE).filter(|c| locales.contains(c)) {
        return code.to_string();
    }
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|accept| locales.negotiate(accept))
        .unwrap_or_else(|| locales.default_code())
        .to_string()
}

/// Value of the first cookie called `name`.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value.trim_matches('"'))
        })
}

/// A `302 Found` redirect.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => AppError::BadRequest(format!("invalid redirect target '{}'", location)).into_response(),
    }
}
