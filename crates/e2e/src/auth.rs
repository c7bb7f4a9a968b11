//! API authentication sessions
//!
//! Tokens are obtained by logging in over HTTP and persisted as a browser
//! storage state (`{ cookies, origins: [{ origin, localStorage }] }`) so the
//! same file can seed a browser context later. Sessions are keyed by
//! environment and user identifier:
//!
//! ```text
//! {auth_dir}/{environment}/{user}/storage-state.json
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use testkit_common::redact::{is_sensitive_key, REDACTED};
use testkit_common::TestConfig;

use crate::api::{ApiClient, ApiRequest, ApiResponse};
use crate::error::{E2eError, E2eResult};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const TOKEN_EXPIRY_KEY: &str = "token_expiry";
pub const DEFAULT_USER: &str = "default-user";
pub const DEFAULT_ENVIRONMENT: &str = "local";
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;
const SESSION_FILE: &str = "storage-state.json";

/// Persisted session, in browser storage-state layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageState {
    #[serde(default)]
    pub cookies: Vec<Value>,
    #[serde(default)]
    pub origins: Vec<OriginState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for StorageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if is_sensitive_key(&self.name) {
            REDACTED
        } else {
            self.value.as_str()
        };
        f.debug_struct("StorageEntry")
            .field("name", &self.name)
            .field("value", &value)
            .finish()
    }
}

impl StorageState {
    /// Single-origin state holding a token and its expiry (epoch ms)
    pub fn with_token(origin: impl Into<String>, token: impl Into<String>, expiry_ms: i64) -> Self {
        Self {
            cookies: Vec::new(),
            origins: vec![OriginState {
                origin: origin.into(),
                local_storage: vec![
                    StorageEntry {
                        name: AUTH_TOKEN_KEY.to_string(),
                        value: token.into(),
                    },
                    StorageEntry {
                        name: TOKEN_EXPIRY_KEY.to_string(),
                        value: expiry_ms.to_string(),
                    },
                ],
            }],
        }
    }

    /// Value of `name` in the first origin's local storage
    pub fn local_storage_value(&self, name: &str) -> Option<&str> {
        self.origins
            .first()?
            .local_storage
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }
}

/// Which session to use
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    pub environment: Option<String>,
    pub user_identifier: Option<String>,
}

impl AuthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn user(mut self, user_identifier: impl Into<String>) -> Self {
        self.user_identifier = Some(user_identifier.into());
        self
    }
}

/// Strategy for obtaining and inspecting session tokens
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn environment(&self, options: &AuthOptions) -> String;

    fn user_identifier(&self, options: &AuthOptions) -> String;

    fn extract_token(&self, state: &StorageState) -> Option<String>;

    fn is_token_expired(&self, state: &StorageState) -> bool;

    /// Obtain a fresh session; called when no valid one is cached
    async fn acquire(&self, options: &AuthOptions) -> E2eResult<StorageState>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

/// Logs in with `POST /api/auth/login` using the configured credentials
pub struct ApiAuthProvider {
    config: Arc<TestConfig>,
    api: ApiClient,
}

impl ApiAuthProvider {
    pub fn new(config: Arc<TestConfig>) -> E2eResult<Self> {
        let api = ApiClient::new(&config)?;
        Ok(Self { config, api })
    }

    /// Expiry check against an explicit clock
    pub fn is_expired_at(state: &StorageState, now_ms: i64) -> bool {
        match state
            .local_storage_value(TOKEN_EXPIRY_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            Some(expiry) => now_ms > expiry,
            None => true,
        }
    }
}

#[async_trait]
impl AuthProvider for ApiAuthProvider {
    fn environment(&self, options: &AuthOptions) -> String {
        options
            .environment
            .clone()
            .filter(|e| !e.is_empty())
            .or_else(|| Some(self.config.environment.clone()).filter(|e| !e.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
    }

    fn user_identifier(&self, options: &AuthOptions) -> String {
        options
            .user_identifier
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string())
    }

    fn extract_token(&self, state: &StorageState) -> Option<String> {
        state.local_storage_value(AUTH_TOKEN_KEY).map(str::to_string)
    }

    fn is_token_expired(&self, state: &StorageState) -> bool {
        Self::is_expired_at(state, Utc::now().timestamp_millis())
    }

    async fn acquire(&self, options: &AuthOptions) -> E2eResult<StorageState> {
        let (email, password) = self.config.credentials()?;
        info!(
            "Logging in as {} ({})",
            self.user_identifier(options),
            self.environment(options)
        );

        let request = ApiRequest::post("/api/auth/login")
            .json(&json!({ "email": email, "password": password.expose() }))?;
        let response: ApiResponse<Value> = self.api.request(request).await?;

        if !response.is_success() {
            let body = match response.body {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            return Err(E2eError::AuthFailed {
                status: response.status,
                body,
            });
        }

        let login: LoginResponse = serde_json::from_value(response.body)
            .map_err(|e| E2eError::InvalidAuthResponse(e.to_string()))?;

        let expires_in_ms = i64::try_from(login.expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expiry = Utc::now().timestamp_millis().saturating_add(expires_in_ms);

        Ok(StorageState::with_token(
            self.config.base_url.clone(),
            login.token,
            expiry,
        ))
    }
}

/// On-disk cache of sessions in front of an [`AuthProvider`]
#[derive(Clone)]
pub struct TokenStore {
    provider: Arc<dyn AuthProvider>,
    dir: PathBuf,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore").field("dir", &self.dir).finish()
    }
}

impl TokenStore {
    pub fn new(provider: Arc<dyn AuthProvider>, dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            dir: dir.into(),
        }
    }

    /// API login provider rooted at `config.auth_dir`
    pub fn from_config(config: Arc<TestConfig>) -> E2eResult<Self> {
        let dir = config.auth_dir.clone();
        let provider = ApiAuthProvider::new(config)?;
        Ok(Self::new(Arc::new(provider), dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn provider(&self) -> &dyn AuthProvider {
        self.provider.as_ref()
    }

    pub fn session_path(&self, options: &AuthOptions) -> PathBuf {
        self.dir
            .join(path_component(&self.provider.environment(options)))
            .join(path_component(&self.provider.user_identifier(options)))
            .join(SESSION_FILE)
    }

    /// Cached state, if a readable one exists
    pub async fn load(&self, options: &AuthOptions) -> E2eResult<Option<StorageState>> {
        let path = self.session_path(options);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                debug!("Ignoring unreadable session {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    pub async fn save(&self, options: &AuthOptions, state: &StorageState) -> E2eResult<PathBuf> {
        let path = self.session_path(options);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec_pretty(state)?).await?;
        debug!("Saved session to {}", path.display());
        Ok(path)
    }

    /// Cached token while it is valid, otherwise a freshly acquired one
    pub async fn token(&self, options: &AuthOptions) -> E2eResult<String> {
        if let Some(state) = self.load(options).await? {
            if !self.provider.is_token_expired(&state) {
                if let Some(token) = self.provider.extract_token(&state) {
                    debug!("Reusing cached session {}", self.session_path(options).display());
                    return Ok(token);
                }
            }
        }
        self.refresh(options).await
    }

    /// Acquire and persist a new session regardless of the cache
    pub async fn refresh(&self, options: &AuthOptions) -> E2eResult<String> {
        let state = self.provider.acquire(options).await?;
        let token = self.provider.extract_token(&state).ok_or_else(|| {
            E2eError::InvalidAuthResponse(format!("session has no {} entry", AUTH_TOKEN_KEY))
        })?;
        self.save(options, &state).await?;
        Ok(token)
    }

    /// Delete one cached session; missing is fine
    pub async fn clear(&self, options: &AuthOptions) -> E2eResult<()> {
        match tokio::fs::remove_file(self.session_path(options)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every cached session under the store directory
    pub async fn clear_all(&self) -> E2eResult<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// One safe path segment; separators and dot-only names cannot escape the store
fn path_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}
