//! API documentation: OpenAPI schema plus Swagger UI and ReDoc pages.
//!
//! The schema is derived from the handler annotations. All three pages
//! require a logged-in user; the browser pages rely on the session cookie,
//! which the schema fetch and Swagger's "try it out" requests send along.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::Value;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use sitekit_core::config::DocsConfig;

use crate::api::auth::{require_login, SESSION_COOKIE};
use crate::api::status::AppError;
use crate::api::{admin, auth, groups, i18n, status, users};
use crate::locale::ActiveLocale;
use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        status::health_check,
        auth::login,
        auth::logout,
        auth::session,
        admin::index,
        users::list_users,
        users::add_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::set_password,
        groups::list_groups,
        groups::create_group,
        i18n::list_languages,
        i18n::switch_language,
    ),
    components(schemas(
        status::HealthResponse,
        status::ErrorResponse,
        status::MessageResponse,
        auth::LoginRequest,
        auth::LoginResponse,
        auth::SessionResponse,
        auth::SessionUser,
        admin::AdminIndex,
        admin::AdminLinks,
        users::UserListItem,
        users::UserDetail,
        users::AddUserRequest,
        users::UpdateUserRequest,
        users::SetPasswordRequest,
        groups::GroupItem,
        groups::CreateGroupRequest,
        i18n::LanguageOption,
        i18n::LanguagesResponse,
    )),
    modifiers(&SessionSchemes),
    tags(
        (name = "status", description = "Liveness"),
        (name = "auth", description = "Login sessions"),
        (name = "admin", description = "Admin site index"),
        (name = "users", description = "User accounts"),
        (name = "groups", description = "Permission groups"),
        (name = "i18n", description = "Languages"),
    )
)]
struct ApiDoc;

/// Registers the two ways a session token can be presented.
struct SessionSchemes;

impl Modify for SessionSchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "sessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
        );
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:lang/documentation/schema/", get(schema))
        .route("/:lang/documentation/swagger-ui/", get(swagger_ui))
        .route("/:lang/documentation/redoc/", get(redoc))
}

async fn schema(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_login(&state, &headers).await?;
    Ok(Json(openapi_document(&state.config.docs, &state.locales.codes())?))
}

async fn swagger_ui(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(ActiveLocale(lang)): Extension<ActiveLocale>,
) -> Result<Html<String>, AppError> {
    require_login(&state, &headers).await?;
    let title = html_escape(&state.config.docs.title);
    Ok(Html(format!(
        r##"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    SwaggerUIBundle({{
      url: "/{lang}/documentation/schema/",
      dom_id: "#swagger-ui",
      requestInterceptor: (req) => {{ req.credentials = "same-origin"; return req; }},
    }});
  </script>
</body>
</html>
"##
    )))
}

async fn redoc(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(ActiveLocale(lang)): Extension<ActiveLocale>,
) -> Result<Html<String>, AppError> {
    require_login(&state, &headers).await?;
    let title = html_escape(&state.config.docs.title);
    Ok(Html(format!(
        r##"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
</head>
<body>
  <redoc spec-url="/{lang}/documentation/schema/"></redoc>
  <script src="https://cdn.redoc.ly/redoc/latest/bundles/redoc.standalone.js"></script>
</body>
</html>
"##
    )))
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// OpenAPI 3 description of the JSON API, titled from the docs settings
/// and with the `lang` path parameter limited to `languages`.
pub fn openapi_document(docs: &DocsConfig, languages: &[&str]) -> Result<Value, AppError> {
    let mut openapi = ApiDoc::openapi();
    openapi.info.title = docs.title.clone();
    openapi.info.version = docs.version.clone();
    openapi.info.description = Some(docs.description.clone()).filter(|d| !d.is_empty());

    let mut doc = serde_json::to_value(&openapi)
        .map_err(|e| AppError::Internal(format!("failed to serialize OpenAPI document: {}", e)))?;

    let operations = doc["paths"]
        .as_object_mut()
        .into_iter()
        .flat_map(|paths| paths.values_mut())
        .filter_map(Value::as_object_mut)
        .flat_map(|item| item.values_mut());
    for operation in operations {
        let Some(params) = operation.get_mut("parameters").and_then(Value::as_array_mut) else {
            continue;
        };
        for param in params.iter_mut().filter(|p| p["name"] == "lang" && p["in"] == "path") {
            param["schema"]["enum"] = Value::from(languages.to_vec());
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        openapi_document(&DocsConfig::default(), &["de", "en"]).unwrap()
    }

    #[test]
    fn test_openapi_document_lists_routes() {
        let doc = document();
        assert_eq!(doc["info"]["title"], "SiteKit API");
        assert!(doc["paths"]["/{lang}/users/{id}"]["patch"].is_object());
        assert!(doc["paths"]["/{lang}/groups"]["post"].is_object());
        assert!(doc["paths"]["/health"]["get"].get("security").is_none());
        assert!(doc["paths"]["/{lang}/session"]["get"]["security"].is_array());
    }

    #[test]
    fn test_lang_parameter_is_limited_to_supported_codes() {
        let doc = document();
        let params = doc["paths"]["/{lang}/users"]["get"]["parameters"]
            .as_array()
            .unwrap();
        let lang = params.iter().find(|p| p["name"] == "lang").unwrap();
        assert_eq!(lang["schema"]["enum"], json!(["de", "en"]));
        assert!(params.iter().any(|p| p["name"] == "q" && p["in"] == "query"));
    }

    #[test]
    fn test_operations_describe_bodies_and_statuses() {
        let doc = document();
        let add = &doc["paths"]["/{lang}/users"]["post"];
        assert!(add["requestBody"]["content"]["application/json"].is_object());
        assert!(add["responses"]["201"].is_object());
        assert!(doc["paths"]["/{lang}/users/{id}"]["delete"]["responses"]["204"].is_object());
        assert!(doc["components"]["schemas"]["UserDetail"].is_object());
        assert_eq!(
            doc["components"]["securitySchemes"]["sessionCookie"]["name"],
            SESSION_COOKIE
        );
    }

    #[test]
    fn test_description_comes_from_settings() {
        let docs = DocsConfig {
            description: "Staff API".into(),
            ..DocsConfig::default()
        };
        let doc = openapi_document(&docs, &["en"]).unwrap();
        assert_eq!(doc["info"]["description"], "Staff API");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<A & B>"), "&lt;A &amp; B&gt;");
    }
}
