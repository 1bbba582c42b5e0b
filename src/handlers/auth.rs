//! Token issuer endpoints: login mints the initial access/refresh pair,
//! refresh exchanges a refresh token for a new pair, whoami echoes the
//! identity the middleware resolved.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, AuthError, TokenKind};
use crate::config;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::middleware::CurrentUser;
use crate::store::{Role, User};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: SessionUser,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<SessionResponse> {
    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| {
            tracing::warn!("login failed: unknown username '{}'", payload.username);
            ApiError::unauthorized("Invalid username or password")
        })?;

    let password_ok = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| ApiError::internal_server_error(format!("password check failed: {}", e)))?;
    if !password_ok {
        tracing::warn!("login failed: bad password for '{}'", user.username);
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let access_token = auth::issue_access_token(user.id).map_err(issuer_error)?;
    let refresh_token = auth::issue_refresh_token(user.id).map_err(issuer_error)?;

    tracing::info!("issued session for '{}'", user.username);
    Ok(ApiResponse::success(SessionResponse {
        access_token,
        refresh_token,
        expires_in: auth::access_token_ttl_secs(),
        user: SessionUser::from(&user),
    }))
}

/// POST /auth/refresh
///
/// The refresh token is verified on its own (signature, expiry, kind) and
/// its subject re-resolved: a deleted account cannot refresh its way back
/// in. Every successful exchange rotates the refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<RefreshResponse> {
    let claims = auth::verify(
        &payload.refresh_token,
        TokenKind::Refresh,
        &config::config().security.jwt_secret,
    )
    .map_err(|e| match e {
        AuthError::Expired => ApiError::ExpiredCredential,
        other => {
            tracing::warn!("refresh rejected: {}", other);
            ApiError::invalid_credential(other.to_string())
        }
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("refresh subject {} no longer resolves to a user", claims.sub);
            ApiError::UnknownSubject
        })?;

    let access_token = auth::issue_access_token(user.id).map_err(issuer_error)?;
    let refresh_token = auth::issue_refresh_token(user.id).map_err(issuer_error)?;

    tracing::debug!("rotated tokens for '{}'", user.username);
    Ok(ApiResponse::success(RefreshResponse {
        access_token,
        refresh_token,
        expires_in: auth::access_token_ttl_secs(),
    }))
}

/// GET /api/auth/whoami
pub async fn whoami(Extension(user): Extension<CurrentUser>) -> ApiResult<SessionUser> {
    Ok(ApiResponse::success(SessionUser {
        id: user.id,
        username: user.username,
        name: user.name,
        role: user.role,
    }))
}

fn issuer_error(err: AuthError) -> ApiError {
    tracing::error!("token issuance failed: {}", err);
    ApiError::internal_server_error("Failed to issue tokens")
}
