//! Admin-gated user management.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::auth::SessionUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::CurrentUser;
use crate::store::{Role, User};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SetRole {
    pub role: Role,
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<SessionUser>> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success(
        users.iter().map(SessionUser::from).collect(),
    ))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> ApiResult<SessionUser> {
    if payload.username.trim().is_empty() {
        return Err(ApiError::bad_request("Username must not be empty"));
    }
    if payload.password.len() < 4 {
        return Err(ApiError::bad_request("Password must be at least 4 characters"));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::internal_server_error(format!("password hashing failed: {}", e)))?;

    let user = state
        .users
        .create(User {
            id: Uuid::new_v4(),
            username: payload.username,
            name: payload.name,
            role: payload.role,
            password_hash,
            created_at: Utc::now(),
            deleted_at: None,
        })
        .await?;

    tracing::info!("created account '{}' ({})", user.username, user.role.as_str());
    Ok(ApiResponse::created(SessionUser::from(&user)))
}

/// PUT /api/admin/users/:id/role
pub async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRole>,
) -> ApiResult<SessionUser> {
    let user = state.users.set_role(id, payload.role).await?;
    tracing::info!("role for '{}' set to {}", user.username, user.role.as_str());
    Ok(ApiResponse::success(SessionUser::from(&user)))
}

/// DELETE /api/admin/users/:id
///
/// Soft delete: the account stops resolving immediately, so any tokens it
/// still holds fail the per-request identity lookup.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    if current.id == id {
        return Err(ApiError::conflict("Cannot delete your own account"));
    }
    state.users.soft_delete(id).await?;
    tracing::info!("account {} deleted by '{}'", id, current.username);
    Ok(ApiResponse::success(()))
}
