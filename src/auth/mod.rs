use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

/// Distinguishes the short-lived bearer credential from the longer-lived
/// exchange credential. A refresh token is never accepted where an access
/// token is expected, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed token payload. Deliberately carries no role: authorization is
/// resolved fresh from the identity store on every request, so a role
/// change takes effect without waiting for tokens to expire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: Uuid, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub,
            kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token kind mismatch, expected {0:?} token")]
    WrongKind(TokenKind),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("JWT secret is not configured")]
    MissingSecret,
}

/// Sign a set of claims with the given HMAC secret.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verify signature and expiry, and check the token kind.
///
/// Expiry is reported as its own error so the middleware can tell callers
/// to refresh rather than re-authenticate.
pub fn verify(token: &str, kind: TokenKind, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid(e.to_string()),
    })?;

    if token_data.claims.kind != kind {
        return Err(AuthError::WrongKind(kind));
    }
    Ok(token_data.claims)
}

/// Mint a short-lived access token for the given subject.
pub fn issue_access_token(user_id: Uuid) -> Result<String, AuthError> {
    let security = &config::config().security;
    let claims = Claims::new(
        user_id,
        TokenKind::Access,
        Duration::minutes(security.access_token_ttl_mins),
    );
    sign(&claims, &security.jwt_secret)
}

/// Mint a refresh token for the given subject. A new one is issued on every
/// exchange; there is no server-side revocation list, expiry is the only
/// bound on its lifetime.
pub fn issue_refresh_token(user_id: Uuid) -> Result<String, AuthError> {
    let security = &config::config().security;
    let claims = Claims::new(
        user_id,
        TokenKind::Refresh,
        Duration::days(security.refresh_token_ttl_days),
    );
    sign(&claims, &security.jwt_secret)
}

/// Access token lifetime in seconds, reported to clients as `expires_in`.
pub fn access_token_ttl_secs() -> i64 {
    config::config().security.access_token_ttl_mins * 60
}
