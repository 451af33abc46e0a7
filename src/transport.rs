//! JSON-RPC transports.
//!
//! [`Transport`] is the seam between request building and the network. The
//! shipped [`HttpTransport`] posts JSON-RPC 2.0 envelopes to an Odoo server;
//! session handling is pluggable through [`SessionSource`] implementations
//! (anonymous, fixed cookie, or password login).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::PagerError;

/// Executes one backend call: posts `params` to `path`, yields the
/// JSON-RPC `result`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn call(&self, path: &str, params: Value) -> Result<Value, PagerError>;
}

// ── SessionSource ───────────────────────────────────────────────────

/// Pluggable session provider. Called before every request.
///
/// Returns `Ok(None)` to send no session cookie (anonymous).
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync + 'static {
    async fn session(&self) -> Result<Option<String>, PagerError>;

    /// Drop any cached session after the server rejected it.
    async fn invalidate(&self) {}
}

/// No session, anonymous requests.
pub struct NoSession;

#[async_trait::async_trait]
impl SessionSource for NoSession {
    async fn session(&self) -> Result<Option<String>, PagerError> {
        Ok(None)
    }
}

/// Session id obtained externally (browser cookie, earlier login).
pub struct StaticSession(String);

impl StaticSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self(session_id.into())
    }
}

#[async_trait::async_trait]
impl SessionSource for StaticSession {
    async fn session(&self) -> Result<Option<String>, PagerError> {
        Ok(Some(self.0.clone()))
    }
}

/// Password login against `/web/session/authenticate`. Authenticates lazily
/// on first use and caches the session id until invalidated.
pub struct PasswordLogin {
    http: reqwest::Client,
    base_url: String,
    database: String,
    login: String,
    password: String,
    cached: tokio::sync::RwLock<Option<String>>,
}

impl PasswordLogin {
    pub fn new(
        base_url: impl Into<String>,
        database: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            login: login.into(),
            password: password.into(),
            cached: tokio::sync::RwLock::new(None),
        }
    }

    async fn do_login(&self) -> Result<String, PagerError> {
        let url = format!("{}/web/session/authenticate", self.base_url);
        let body = envelope(0, json!({
            "db": self.database,
            "login": self.login,
            "password": self.password,
        }));
        let resp = self.http.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(PagerError::Auth(format!("login failed ({}): {}", status, body)));
        }

        let cookie = resp
            .cookies()
            .find(|c| c.name() == "session_id")
            .map(|c| c.value().to_string());
        let reply: RpcReply = resp
            .json()
            .await
            .map_err(|e| PagerError::Decode(format!("login response: {}", e)))?;
        let result = reply.into_result().map_err(|e| PagerError::Auth(e.to_string()))?;

        if result.get("uid").map_or(true, Value::is_null) {
            return Err(PagerError::Auth(format!("login rejected for '{}'", self.login)));
        }

        let session_id = cookie
            .or_else(|| result.get("session_id").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| PagerError::Auth("login response carries no session id".into()))?;
        info!("authenticated '{}' on database '{}'", self.login, self.database);
        Ok(session_id)
    }
}

#[async_trait::async_trait]
impl SessionSource for PasswordLogin {
    async fn session(&self) -> Result<Option<String>, PagerError> {
        // Fast path: read lock, check cache.
        {
            let guard = self.cached.read().await;
            if let Some(ref session) = *guard {
                return Ok(Some(session.clone()));
            }
        }

        // Slow path: write lock, re-check, login.
        let mut guard = self.cached.write().await;
        if let Some(ref session) = *guard {
            return Ok(Some(session.clone()));
        }

        let fresh = self.do_login().await?;
        *guard = Some(fresh.clone());
        Ok(Some(fresh))
    }

    async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

// ── JSON-RPC envelope ───────────────────────────────────────────────

fn envelope(id: u64, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "call",
        "params": params,
        "id": id,
    })
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    name: String,
    #[serde(default)]
    message: String,
}

impl RpcReply {
    fn into_result(self) -> Result<Value, PagerError> {
        if let Some(err) = self.error {
            // Odoo puts the useful text (exception class + message) in `data`.
            let message = match err.data {
                Some(data) if !data.message.is_empty() => {
                    if data.name.is_empty() {
                        data.message
                    } else {
                        format!("{}: {}", data.name, data.message)
                    }
                }
                _ => err.message,
            };
            return Err(PagerError::Rpc { code: err.code, message });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

// ── HttpTransport ───────────────────────────────────────────────────

/// JSON-RPC over HTTP against an Odoo server.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionSource>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
            next_id: AtomicU64::new(1),
        }
    }

    /// Pick the session source from the config: a fixed session id wins,
    /// then login/password, else anonymous.
    pub fn from_config(config: &ClientConfig) -> Result<Self, PagerError> {
        config.validate()?;
        if config.server.is_empty() {
            return Err(PagerError::Configuration("server URL is not set".into()));
        }
        let session: Arc<dyn SessionSource> = if !config.session_id.is_empty() {
            Arc::new(StaticSession::new(config.session_id.clone()))
        } else if !config.login.is_empty() {
            Arc::new(PasswordLogin::new(
                config.server.clone(),
                config.database.clone(),
                config.login.clone(),
                config.password.clone(),
            ))
        } else {
            Arc::new(NoSession)
        };
        Ok(Self::new(config.server.clone(), session))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn call(&self, path: &str, params: Value) -> Result<Value, PagerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}{}", self.base_url, path);
        debug!("rpc #{} -> {}", id, path);

        let mut req = self.http.post(&url).json(&envelope(id, params));
        if let Some(session) = self.session.session().await? {
            req = req.header(reqwest::header::COOKIE, format!("session_id={}", session));
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            if code == 401 || code == 403 {
                self.session.invalidate().await;
            }
            return Err(PagerError::Server { status: code, message: body });
        }

        let reply: RpcReply = resp
            .json()
            .await
            .map_err(|e| PagerError::Decode(format!("rpc #{} response body: {}", id, e)))?;
        match reply.into_result() {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!("rpc #{} {} failed: {}", id, path, err);
                if let PagerError::Rpc { code: 100, .. } = err {
                    // Odoo's "session expired".
                    self.session.invalidate().await;
                }
                Err(err)
            }
        }
    }
}
