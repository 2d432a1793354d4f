//! Admin login and the explicit session lifecycle: set at login, cleared at
//! logout, read when a client needs to attach credentials.
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::{check_status, ApiError};

/// The opaque server response from a successful login. `token` is lifted out
/// when the backend supplies one; the rest is kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub raw: Value,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// POST credentials to the admin login endpoint. Both fields are required;
/// local validation failures issue no request.
pub async fn login(origin: &str, email: &str, password: &str) -> Result<Session, ApiError> {
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::Server("Email and password are required".into()));
    }

    let url = format!("{}/api/admin/login", origin.trim_end_matches('/'));
    let http = Client::builder()
        .user_agent("marble-admin/0.1")
        .build()
        .map_err(ApiError::Network)?;
    let res = http
        .post(&url)
        .json(&LoginRequest { email, password })
        .send()
        .await
        .map_err(ApiError::Network)?;
    let res = check_status(res).await?;
    let raw: Value = res.json().await.map_err(ApiError::Network)?;

    let token = extract_token(&raw);
    info!(has_token = token.is_some(), "logged in");
    Ok(Session { token, raw })
}

/// Best-effort token lookup in the opaque body: top-level `token`, then
/// `data.token`.
fn extract_token(raw: &Value) -> Option<String> {
    raw.get("token")
        .or_else(|| raw.get("data").and_then(|d| d.get("token")))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// File-backed session storage under the configured data dir.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &str) -> Self {
        Self {
            path: Path::new(data_dir).join("session.json"),
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, body)
            .with_context(|| format!("failed to write session: {}", self.path.display()))
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let body = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session: {}", self.path.display()))?;
        let session = serde_json::from_str(&body)
            .with_context(|| format!("corrupt session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove session: {}", self.path.display()))?;
            info!("logged out");
        }
        Ok(())
    }
}
