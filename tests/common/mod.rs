use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

/// Shared with the spawned server so tests can mint tokens it will accept.
pub const JWT_SECRET: &str = "integration-test-secret";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-test-password";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub base_url: String,
    _child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_storereport-api"));
        cmd.env("APP_ENV", "development")
            .env("PORT", port.to_string())
            .env("JWT_SECRET", JWT_SECRET)
            .env("ADMIN_USERNAME", ADMIN_USERNAME)
            .env("ADMIN_PASSWORD", ADMIN_PASSWORD)
            // Force the in-memory stores regardless of the host environment
            .env_remove("DATABASE_URL")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self {
            base_url,
            _child: child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
}

/// Log in through the real endpoint and return the issued pair.
pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<Session> {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::OK,
        "login as '{}' failed with {}",
        username,
        res.status()
    );

    let body = res.json::<Value>().await?;
    Ok(Session {
        access_token: body["data"]["access_token"]
            .as_str()
            .context("missing access_token")?
            .to_string(),
        refresh_token: body["data"]["refresh_token"]
            .as_str()
            .context("missing refresh_token")?
            .to_string(),
        user_id: body["data"]["user"]["id"]
            .as_str()
            .context("missing user id")?
            .parse()?,
    })
}

pub async fn admin_session(server: &TestServer) -> Result<Session> {
    login(server, ADMIN_USERNAME, ADMIN_PASSWORD).await
}

/// Create an account through the admin API and return its id.
pub async fn create_user(
    server: &TestServer,
    admin_access: &str,
    username: &str,
    password: &str,
    role: &str,
) -> Result<Uuid> {
    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/api/admin/users", server.base_url))
        .bearer_auth(admin_access)
        .json(&json!({
            "username": username,
            "name": username,
            "password": password,
            "role": role,
        }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "creating '{}' failed with {}",
        username,
        res.status()
    );

    let body = res.json::<Value>().await?;
    Ok(body["data"]["id"]
        .as_str()
        .context("missing created user id")?
        .parse()?)
}

/// Unique username per call so parallel tests never collide.
pub fn unique_username(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().to_string()[..8])
}
