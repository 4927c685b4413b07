//! Language listing and switching.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use sitekit_core::errors::LocaleError;

use crate::api::status::{AppError, ErrorResponse};
use crate::locale::{found, ActiveLocale, LANGUAGE_COOKIE};
use crate::AppState;

/// Lifetime of the language cookie (one year).
const LANGUAGE_COOKIE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LanguagesQuery {
    /// Page to compute switch URLs for; defaults to the localized root.
    pub next: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SwitchQuery {
    /// Target language code.
    pub to: String,
    /// Page to switch; defaults to the localized root.
    pub next: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LanguageOption {
    code: String,
    name: String,
    active: bool,
    url: String,
}

#[derive(Serialize, ToSchema)]
pub struct LanguagesResponse {
    current: String,
    languages: Vec<LanguageOption>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:lang/i18n/", get(list_languages))
        .route("/:lang/i18n/switch", get(switch_language))
}

/// Supported languages with the URL of the current page in each.
#[utoipa::path(
    get,
    path = "/{lang}/i18n/",
    tag = "i18n",
    params(("lang" = String, Path, description = "Language prefix"), LanguagesQuery),
    responses(
        (status = 200, description = "Supported languages", body = LanguagesResponse),
        (status = 400, description = "`next` is not a local path", body = ErrorResponse),
    )
)]
pub async fn list_languages(
    State(state): State<Arc<AppState>>,
    Extension(ActiveLocale(current)): Extension<ActiveLocale>,
    Query(query): Query<LanguagesQuery>,
) -> Result<Json<LanguagesResponse>, AppError> {
    let page = local_target(query.next.as_deref(), &current)?;

    let languages = state
        .locales
        .languages()
        .iter()
        .map(|language| {
            Ok(LanguageOption {
                code: language.code.clone(),
                name: language.name.clone(),
                active: language.code == current,
                url: state.locales.switch(&page, &language.code)?,
            })
        })
        .collect::<Result<Vec<_>, LocaleError>>()?;

    Ok(Json(LanguagesResponse { current, languages }))
}

/// Remember a language and redirect to the page in that language.
#[utoipa::path(
    get,
    path = "/{lang}/i18n/switch",
    tag = "i18n",
    params(("lang" = String, Path, description = "Language prefix"), SwitchQuery),
    responses(
        (status = 302, description = "Redirect to the switched page; sets the `lang` cookie"),
        (status = 400, description = "Unsupported language or non-local `next`", body = ErrorResponse),
    )
)]
pub async fn switch_language(
    State(state): State<Arc<AppState>>,
    Extension(ActiveLocale(current)): Extension<ActiveLocale>,
    Query(query): Query<SwitchQuery>,
) -> Result<Response, AppError> {
    let page = local_target(query.next.as_deref(), &current)?;
    let location = state.locales.switch(&page, &query.to)?;
    debug!(from = %current, to = %query.to, location = %location, "switching language");

    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        LANGUAGE_COOKIE, query.to, LANGUAGE_COOKIE_MAX_AGE
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|_| AppError::BadRequest(format!("invalid language code '{}'", query.to)))?;

    let mut response = found(&location);
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// A same-site path to redirect to. Absolute and scheme-relative URLs are
/// rejected so the switch endpoint cannot be used as an open redirect.
fn local_target(next: Option<&str>, current: &str) -> Result<String, AppError> {
    match next {
        None | Some("") => Ok(format!("/{}/", current)),
        Some(path) if path.starts_with("//") || !path.starts_with('/') => Err(AppError::BadRequest(
            format!("'{}' is not a local path", path),
        )),
        Some(path) => Ok(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_target() {
        assert_eq!(local_target(None, "de").unwrap(), "/de/");
        assert_eq!(local_target(Some("/en/users?q=a"), "de").unwrap(), "/en/users?q=a");
        assert!(local_target(Some("//evil.example/"), "de").is_err());
        assert!(local_target(Some("https://evil.example/"), "de").is_err());
    }
}
