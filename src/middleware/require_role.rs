use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::CurrentUser;
use crate::error::ApiError;
use crate::store::Role;

/// Route layer admitting ADMIN only.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// Route layer admitting any authenticated staff account (USER or ADMIN).
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    check_role(&request, &[Role::User, Role::Admin])?;
    Ok(next.run(request).await)
}

/// The single capability check both gates share. Inspects the identity
/// already attached by `require_auth`; a missing identity means the auth
/// middleware did not run, which is an authentication failure, while a
/// resolved identity with the wrong role is a 403.
fn check_role(request: &Request, allowed: &[Role]) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ApiError::NoCredential)?;

    if allowed.contains(&user.role) {
        return Ok(());
    }

    tracing::warn!(
        "user '{}' with role {} denied, requires {}",
        user.username,
        user.role.as_str(),
        describe_roles(allowed),
    );
    Err(ApiError::insufficient_role(format!(
        "{} role required",
        describe_roles(allowed)
    )))
}

fn describe_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}
