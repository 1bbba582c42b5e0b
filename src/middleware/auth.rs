use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, AuthError, TokenKind};
use crate::config;
use crate::error::ApiError;
use crate::store::Role;
use crate::AppState;

/// Authenticated identity attached to the request by [`require_auth`].
///
/// The role comes from the identity store, not the token, so it reflects
/// the current state of the account.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: Role,
}

/// Bearer-token authentication middleware.
///
/// Performs exactly one identity lookup per request. Rejections never
/// propagate as panics or opaque errors; every path maps to a structured
/// 401 body via [`ApiError`].
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)?;

    let claims = auth::verify(
        &token,
        TokenKind::Access,
        &config::config().security.jwt_secret,
    )
    .map_err(|e| match e {
        AuthError::Expired => ApiError::ExpiredCredential,
        other => {
            tracing::warn!("rejected bearer token: {}", other);
            ApiError::invalid_credential(other.to_string())
        }
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("token subject {} no longer resolves to a user", claims.sub);
            ApiError::UnknownSubject
        })?;

    tracing::debug!("authenticated {} ({})", user.username, user.role.as_str());
    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        username: user.username,
        name: user.name,
        role: user.role,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .ok_or(ApiError::NoCredential)?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::invalid_credential("Authorization header is not valid UTF-8"))?;

    // Anything other than a Bearer credential counts as no credential at all.
    let token = value.strip_prefix("Bearer ").ok_or(ApiError::NoCredential)?;
    if token.trim().is_empty() {
        return Err(ApiError::NoCredential);
    }
    Ok(token.to_string())
}
