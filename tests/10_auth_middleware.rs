//! Request middleware behavior: credential extraction, the rejection
//! taxonomy, and the role gates.

mod common;

use anyhow::Result;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use storereport_api::auth::{sign, Claims, TokenKind};

fn signed_token(sub: Uuid, kind: TokenKind, iat_offset: i64, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub,
        kind,
        jti: Uuid::new_v4(),
        iat: now + iat_offset,
        exp: now + exp_offset,
    };
    sign(&claims, common::JWT_SECRET).expect("signing with test secret")
}

#[tokio::test]
async fn no_credential_is_rejected_with_access_denied() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["message"], "No token provided");
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_counts_as_no_credential() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Access denied");
    Ok(())
}

#[tokio::test]
async fn malformed_token_is_invalid_not_expired() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .bearer_auth("definitely-not-a-jwt")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_token_gets_its_own_label() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Validly signed, but expired well past the verification leeway.
    let token = signed_token(Uuid::new_v4(), TokenKind::Access, -7200, -3600);
    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Token expired");
    Ok(())
}

#[tokio::test]
async fn refresh_token_rejected_as_bearer_credential() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let token = signed_token(Uuid::new_v4(), TokenKind::Refresh, 0, 3600);
    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn verified_token_for_unknown_subject_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Signature verifies, but the subject never existed.
    let token = signed_token(Uuid::new_v4(), TokenKind::Access, 0, 3600);
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["message"], "User not found");
    Ok(())
}

#[tokio::test]
async fn deleted_user_token_stops_working_immediately() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin = common::admin_session(server).await?;
    let username = common::unique_username("doomed");
    let user_id =
        common::create_user(server, &admin.access_token, &username, "secret-pw", "USER").await?;
    let session = common::login(server, &username, "secret-pw").await?;

    // Token works before deletion.
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&session.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(format!("{}/api/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&admin.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Same still-unexpired token now fails the identity lookup.
    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&session.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Access denied");
    assert_eq!(body["message"], "User not found");
    Ok(())
}

#[tokio::test]
async fn admin_gate_rejects_user_role_with_403() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin = common::admin_session(server).await?;
    let username = common::unique_username("staff");
    common::create_user(server, &admin.access_token, &username, "secret-pw", "USER").await?;
    let staff = common::login(server, &username, "secret-pw").await?;

    let res = client
        .get(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&staff.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Forbidden");

    // Same credential is fine on a staff route: forbidden is about role,
    // not authentication.
    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .bearer_auth(&staff.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn staff_gate_admits_both_roles() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin = common::admin_session(server).await?;
    let res = client
        .get(format!("{}/api/reports", server.base_url))
        .bearer_auth(&admin.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&admin.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn role_change_takes_effect_without_a_new_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let admin = common::admin_session(server).await?;
    let username = common::unique_username("promoted");
    let user_id =
        common::create_user(server, &admin.access_token, &username, "secret-pw", "USER").await?;
    let session = common::login(server, &username, "secret-pw").await?;

    let res = client
        .put(format!(
            "{}/api/admin/users/{}/role",
            server.base_url, user_id
        ))
        .bearer_auth(&admin.access_token)
        .json(&serde_json::json!({ "role": "ADMIN" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // The pre-promotion token now carries admin rights: role is read fresh
    // from the store on every request.
    let res = client
        .get(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(&session.access_token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
