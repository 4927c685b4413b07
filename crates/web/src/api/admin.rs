//! Admin site index.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use sitekit_core::users::UserStore;

use crate::api::auth::require_staff;
use crate::api::status::{AppError, ErrorResponse};
use crate::locale::{found, ActiveLocale};
use crate::{run_blocking, AppState};

#[derive(Serialize, ToSchema)]
pub struct AdminIndex {
    site: String,
    user: String,
    user_count: i64,
    group_count: usize,
    links: AdminLinks,
}

/// Entry points of the admin API for the active language.
#[derive(Serialize, ToSchema)]
pub struct AdminLinks {
    users: String,
    groups: String,
    languages: String,
    documentation: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:lang", get(redirect_to_index))
        .route("/:lang/", get(index))
}

async fn redirect_to_index(Path(lang): Path<String>) -> Response {
    found(&format!("/{}/", lang))
}

/// Site overview for staff users.
#[utoipa::path(
    get,
    path = "/{lang}/",
    tag = "admin",
    params(("lang" = String, Path, description = "Language prefix")),
    responses(
        (status = 200, description = "Admin index", body = AdminIndex),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Not staff", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    axum::Extension(ActiveLocale(lang)): axum::Extension<ActiveLocale>,
) -> Result<Json<AdminIndex>, AppError> {
    let admin = require_staff(&state, &headers).await?;
    let (user_count, group_count) = run_blocking(&state, |state| {
        Ok((state.db.count_users()?, state.db.list_groups()?.len()))
    })
    .await?;

    Ok(Json(AdminIndex {
        site: state.config.docs.title.clone(),
        user: admin.to_string(),
        user_count,
        group_count,
        links: AdminLinks {
            users: format!("/{}/users", lang),
            groups: format!("/{}/groups", lang),
            languages: format!("/{}/i18n/", lang),
            documentation: format!("/{}/documentation/swagger-ui/", lang),
        },
    }))
}
