//! Admin endpoints for user accounts.
//!
//! The list view searches email and names, filters on the superuser and
//! active flags, and orders by email. On the change view `is_superuser`,
//! `last_login` and `date_joined` are read-only; the add form may set them.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use sitekit_core::errors::ValidationError;
use sitekit_core::users::{ExtraFields, User, UserAttributes, UserQuery, UserStore};

use crate::api::auth::require_staff;
use crate::api::status::{AppError, ErrorResponse, MessageResponse};
use crate::{run_blocking, AppState};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Search term matched against email, first and last name.
    pub q: Option<String>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
    /// Page size, 1 to 500 (default 100).
    pub per_page: Option<u32>,
    /// 1-based page number.
    pub page: Option<u32>,
}

/// Row of the user list.
#[derive(Serialize, ToSchema)]
pub struct UserListItem {
    id: String,
    email: String,
    full_name: String,
    is_admin: bool,
    is_active: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserDetail {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    full_name: String,
    is_staff: bool,
    is_superuser: bool,
    is_active: bool,
    /// RFC 3339, in the site time zone.
    date_joined: String,
    last_login: Option<String>,
    groups: Vec<String>,
}

/// The add form. Flags left out take the regular-user defaults.
#[derive(Deserialize, ToSchema)]
pub struct AddUserRequest {
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_superuser: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Group ids; every id must exist.
    pub groups: Option<Vec<i64>>,
    pub date_joined: Option<DateTime<Utc>>,
}

/// Editable fields of the change view. Unknown (including read-only)
/// fields are rejected.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
    /// Replaces all memberships when present.
    pub groups: Option<Vec<i64>>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub password1: String,
    pub password2: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:lang/users", get(list_users).post(add_user))
        .route(
            "/:lang/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/:lang/users/:id/password", post(set_password))
}

/// Search and filter user accounts, ordered by email.
#[utoipa::path(
    get,
    path = "/{lang}/users",
    tag = "users",
    params(("lang" = String, Path, description = "Language prefix"), ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = [UserListItem]),
        (status = 401, description = "Not logged in", body = ErrorResponse),
        (status = 403, description = "Not staff", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    require_staff(&state, &headers).await?;

    let per_page = query.per_page.unwrap_or(100).clamp(1, 500);
    let page = query.page.unwrap_or(1).max(1);
    let users = run_blocking(&state, move |state| {
        Ok(state.db.list_users(&UserQuery {
            search: query.q,
            is_superuser: query.is_superuser,
            is_active: query.is_active,
            limit: Some(per_page),
            offset: Some((page - 1).saturating_mul(per_page)),
        })?)
    })
    .await?;

    let items = users
        .iter()
        .map(|u| UserListItem {
            id: u.id.to_string(),
            email: u.email.clone(),
            full_name: u.full_name(),
            is_admin: u.is_admin(),
            is_active: u.is_active,
        })
        .collect();

    Ok(Json(items))
}

/// Create a user from the add form.
#[utoipa::path(
    post,
    path = "/{lang}/users",
    tag = "users",
    params(("lang" = String, Path, description = "Language prefix")),
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "User created", body = UserDetail),
        (status = 400, description = "Invalid or duplicate email, mismatched or rejected password", body = ErrorResponse),
        (status = 404, description = "Unknown group id", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<UserDetail>), AppError> {
    let admin = require_staff(&state, &headers).await?;

    if body.password1 != body.password2 {
        return Err(ValidationError::PasswordMismatch.into());
    }
    state
        .policy
        .validate(
            &body.password1,
            &UserAttributes {
                email: body.email.trim(),
                first_name: body.first_name.as_deref(),
                last_name: body.last_name.as_deref(),
            },
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let detail = run_blocking(&state, move |state| {
        let group_ids = body.groups.unwrap_or_default();
        for id in &group_ids {
            if state.db.get_group(*id)?.is_none() {
                return Err(AppError::NotFound(format!("group '{}' not found", id)));
            }
        }

        let manager = state.users();
        let user = manager.create_user(
            &body.email,
            Some(&body.password1),
            ExtraFields {
                first_name: body.first_name,
                last_name: body.last_name,
                is_staff: body.is_staff,
                is_superuser: body.is_superuser,
                is_active: body.is_active,
                date_joined: body.date_joined,
            },
        )?;
        if !group_ids.is_empty() {
            manager.set_groups(&user, &group_ids)?;
        }
        user_detail(state, user)
    })
    .await?;
    info!(user_id = %detail.id, by = %admin.id, "user added from admin");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// The change view of one user.
#[utoipa::path(
    get,
    path = "/{lang}/users/{id}",
    tag = "users",
    params(
        ("lang" = String, Path, description = "Language prefix"),
        ("id" = Uuid, Path, description = "User id"),
    ),
    responses(
        (status = 200, description = "The user", body = UserDetail),
        (status = 404, description = "No such user", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((_lang, id)): Path<(String, Uuid)>,
) -> Result<Json<UserDetail>, AppError> {
    require_staff(&state, &headers).await?;
    let detail = run_blocking(&state, move |state| {
        let user = load_user(state, id)?;
        user_detail(state, user)
    })
    .await?;
    Ok(Json(detail))
}

/// Apply the change form. The record and its memberships change together
/// or not at all.
#[utoipa::path(
    patch,
    path = "/{lang}/users/{id}",
    tag = "users",
    params(
        ("lang" = String, Path, description = "Language prefix"),
        ("id" = Uuid, Path, description = "User id"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserDetail),
        (status = 400, description = "Invalid or duplicate email", body = ErrorResponse),
        (status = 404, description = "No such user or group", body = ErrorResponse),
        (status = 422, description = "Unknown or read-only field in the body"),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((_lang, id)): Path<(String, Uuid)>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserDetail>, AppError> {
    let admin = require_staff(&state, &headers).await?;

    let detail = run_blocking(&state, move |state| {
        let manager = state.users();
        let mut user = load_user(state, id)?;

        if let Some(email) = body.email.as_deref() {
            manager.change_email(&mut user, email)?;
        }
        if let Some(first_name) = body.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = body.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(is_staff) = body.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_active) = body.is_active {
            user.is_active = is_active;
        }
        match body.groups.as_deref() {
            Some(groups) => manager.save_with_groups(&mut user, groups)?,
            None => manager.save(&mut user)?,
        }
        user_detail(state, user)
    })
    .await?;
    info!(user_id = %id, by = %admin.id, "user changed from admin");

    Ok(Json(detail))
}

/// Delete a user and close its sessions.
#[utoipa::path(
    delete,
    path = "/{lang}/users/{id}",
    tag = "users",
    params(
        ("lang" = String, Path, description = "Language prefix"),
        ("id" = Uuid, Path, description = "User id"),
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "No such user", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((_lang, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let admin = require_staff(&state, &headers).await?;
    run_blocking(&state, move |state| {
        let user = load_user(state, id)?;
        Ok(state.users().delete(&user)?)
    })
    .await?;

    // Sessions of the deleted account are dead.
    state.sessions.write().await.retain(|_, s| s.user_id != id);
    info!(user_id = %id, by = %admin.id, "user deleted from admin");

    Ok(StatusCode::NO_CONTENT)
}

/// Set a new password from the admin password form.
#[utoipa::path(
    post,
    path = "/{lang}/users/{id}/password",
    tag = "users",
    params(
        ("lang" = String, Path, description = "Language prefix"),
        ("id" = Uuid, Path, description = "User id"),
    ),
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Mismatched or rejected password", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse),
    ),
    security(("bearerAuth" = []), ("sessionCookie" = []))
)]
pub async fn set_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((_lang, id)): Path<(String, Uuid)>,
    Json(body): Json<SetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let admin = require_staff(&state, &headers).await?;
    if body.password1 != body.password2 {
        return Err(ValidationError::PasswordMismatch.into());
    }

    run_blocking(&state, move |state| {
        let mut user = load_user(state, id)?;
        state
            .policy
            .validate(
                &body.password1,
                &UserAttributes {
                    email: &user.email,
                    first_name: user.first_name.as_deref(),
                    last_name: user.last_name.as_deref(),
                },
            )
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let manager = state.users();
        manager.set_password(&mut user, Some(&body.password1))?;
        manager.save(&mut user)?;
        Ok(())
    })
    .await?;
    info!(user_id = %id, by = %admin.id, "password changed from admin");

    Ok(Json(MessageResponse::new("password changed")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .users()
        .get(id)?
        .ok_or_else(|| AppError::NotFound(format!("user '{}' not found", id)))
}

fn user_detail(state: &AppState, user: User) -> Result<UserDetail, AppError> {
    let groups = state.users().group_names(&user)?;
    Ok(UserDetail {
        id: user.id.to_string(),
        full_name: user.full_name(),
        date_joined: state.local_time(user.date_joined),
        last_login: user.last_login.map(|t| state.local_time(t)),
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        is_active: user.is_active,
        groups,
    })
}
