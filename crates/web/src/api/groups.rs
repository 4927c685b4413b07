//! Admin endpoints for groups.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use sitekit_core::errors::ValidationError;
use sitekit_core::users::Group;

use crate::api::auth::require_staff;
use crate::api::status::{AppError, ErrorResponse};
use crate::{run_blocking, AppState};

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct GroupItem {
    id: i64,
    name: String,
}

impl From<Group> for GroupItem {
    fn from(group: Group) -> Self {
        Self {
            id: group.id,
            name: group.name,
        }
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/:lang/groups", get(list_groups).post(create_group))
}

/// All groups ordered by name.
#[utoipa::path(
    get,
    path = "/{lang}/groups",
    tag = "groups",
    params(("lang" = String, Path, description = "Language prefix")),
    responses(
        (status = 200, description = "All groups", body = [GroupItem]),
        (status = 403, description = "Not staff", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<GroupItem>>, AppError> {
    require_staff(&state, &headers).await?;
    let groups = run_blocking(&state, |state| Ok(state.db.list_groups()?)).await?;
    Ok(Json(groups.into_iter().map(GroupItem::from).collect()))
}

#[utoipa::path(
    post,
    path = "/{lang}/groups",
    tag = "groups",
    params(("lang" = String, Path, description = "Language prefix")),
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupItem),
        (status = 400, description = "Empty or already taken name", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupItem>), AppError> {
    let admin = require_staff(&state, &headers).await?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ValidationError::InvalidGroupName(body.name).into());
    }

    let group = run_blocking(&state, move |state| {
        if state.db.get_group_by_name(&name)?.is_some() {
            return Err(AppError::BadRequest(format!("group '{}' already exists", name)));
        }
        Ok(state.db.create_group(&name)?)
    })
    .await?;
    info!(group_id = group.id, name = %group.name, by = %admin.id, "group created from admin");
    Ok((StatusCode::CREATED, Json(GroupItem::from(group))))
}
