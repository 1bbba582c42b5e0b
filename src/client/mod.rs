//! Client-side request gateway used by the mobile app layer.
//!
//! Wraps every protected call: attaches the stored access token, and on a
//! 401 exchanges the stored refresh token for a new pair and replays the
//! call exactly once. A 401 on the replayed call is returned to the caller
//! untouched; there is no second retry, so a broken refresh cycle can never
//! loop. When the exchange itself fails (or there is nothing to exchange)
//! both tokens are cleared and the session-expired hook fires, which is the
//! host app's cue to show the login surface.

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

/// The locally stored credential pair. Survives process restarts only if
/// the host app persists it via [`Gateway::session`] and feeds it back
/// through [`Gateway::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("login failed: {0}")]
    LoginFailed(String),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct SessionData {
    access_token: String,
    refresh_token: String,
    user: SessionUser,
}

#[derive(Deserialize)]
struct RefreshedTokens {
    access_token: String,
    refresh_token: Option<String>,
}

type SessionExpiredHook = Box<dyn Fn() + Send + Sync>;

pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    /// Also the in-flight-refresh guard: the exchange happens while this
    /// lock is held, so concurrently failing calls serialize, and whichever
    /// arrives second sees the already-renewed token instead of issuing a
    /// redundant exchange.
    tokens: Mutex<Option<TokenPair>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens: Mutex::new(None),
            on_session_expired: None,
        }
    }

    /// Install the hook fired when the session is irrecoverably gone.
    pub fn on_session_expired(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_expired = Some(Box::new(hook));
        self
    }

    /// Restore a persisted session, e.g. after an app restart.
    pub async fn restore(&self, access: String, refresh: Option<String>) {
        *self.tokens.lock().await = Some(TokenPair { access, refresh });
    }

    /// Current credential pair, for persistence by the host app.
    pub async fn session(&self) -> Option<TokenPair> {
        self.tokens.lock().await.clone()
    }

    /// Discard the stored credentials.
    pub async fn logout(&self) {
        *self.tokens.lock().await = None;
    }

    /// Authenticate and store the issued credential pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionUser, GatewayError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "authentication failed".to_string());
            return Err(GatewayError::LoginFailed(message));
        }

        let body: Envelope<SessionData> = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        *self.tokens.lock().await = Some(TokenPair {
            access: body.data.access_token,
            refresh: Some(body.data.refresh_token),
        });
        Ok(body.data.user)
    }

    pub async fn get(&self, path: &str) -> Result<Response, GatewayError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        let body = serde_json::to_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        let body = serde_json::to_value(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, GatewayError> {
        self.send(Method::DELETE, path, None).await
    }

    /// One protected call through the retry state machine.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, GatewayError> {
        let sent_access = self
            .tokens
            .lock()
            .await
            .as_ref()
            .map(|pair| pair.access.clone());

        let response = self
            .dispatch(&method, path, body.as_ref(), sent_access.as_deref())
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // Any 401 is treated as "need a fresh token", whether the stored one
        // was expired or absent: the remedy is the same.
        let renewed = match self.renew_access_token(sent_access.as_deref()).await {
            Some(token) => token,
            // Terminal: propagate the original failure.
            None => return Ok(response),
        };

        // Exactly one replay; its outcome is final either way.
        self.dispatch(&method, path, body.as_ref(), Some(&renewed))
            .await
            .map_err(Into::into)
    }

    /// Obtain a usable access token after a 401, or None if the session is
    /// over. Holds the token lock for the whole exchange.
    async fn renew_access_token(&self, sent_access: Option<&str>) -> Option<String> {
        let mut guard = self.tokens.lock().await;

        // Another call may have completed an exchange while we waited on
        // the lock; if so its token is fresher than the one we sent.
        if let Some(pair) = guard.as_ref() {
            if sent_access != Some(pair.access.as_str()) {
                return Some(pair.access.clone());
            }
        }

        let refresh = match guard.as_ref().and_then(|pair| pair.refresh.clone()) {
            Some(token) => token,
            None => {
                *guard = None;
                drop(guard);
                self.fire_session_expired();
                return None;
            }
        };

        let exchanged = self
            .http
            .post(format!("{}/auth/refresh", self.base_url))
            .json(&json!({ "refresh_token": refresh }))
            .send()
            .await;

        let renewed = match exchanged {
            Ok(response) if response.status().is_success() => {
                response.json::<Envelope<RefreshedTokens>>().await.ok()
            }
            _ => None,
        };

        match renewed {
            Some(body) => {
                let access = body.data.access_token.clone();
                *guard = Some(TokenPair {
                    access: body.data.access_token,
                    // Keep the old refresh token unless the server rotated it.
                    refresh: Some(body.data.refresh_token.unwrap_or(refresh)),
                });
                Some(access)
            }
            None => {
                *guard = None;
                drop(guard);
                self.fire_session_expired();
                None
            }
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
        access: Option<&str>,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self
            .http
            .request(method.clone(), format!("{}{}", self.base_url, path));
        if let Some(token) = access {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    fn fire_session_expired(&self) {
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
    }
}
