//! Test configuration
//!
//! Assembled once at process start and passed by reference to every
//! collaborator. Layers, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. Optional YAML file
//! 3. Environment variables (empty values count as unset)

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::poll::PollOptions;
use crate::redact::Secret;

pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_TEST_ENV: &str = "TEST_ENV";
pub const ENV_USER_EMAIL: &str = "TEST_USER_EMAIL";
pub const ENV_USER_PASSWORD: &str = "TEST_USER_PASSWORD";
pub const ENV_AUTH_DIR: &str = "TESTKIT_AUTH_DIR";
pub const ENV_POLL_TIMEOUT_MS: &str = "TESTKIT_POLL_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "TESTKIT_POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TESTKIT_REQUEST_TIMEOUT_MS";
pub const ENV_HEALTH_PATH: &str = "TESTKIT_HEALTH_PATH";
pub const ENV_STARTUP_TIMEOUT_MS: &str = "TESTKIT_STARTUP_TIMEOUT_MS";

/// Configuration shared by the API client, auth, fixtures and CLI
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Base URL of the system under test
    pub base_url: String,

    /// Environment name used to scope cached auth sessions
    pub environment: String,

    /// Login email for the API auth provider
    pub user_email: Option<String>,

    /// Login password for the API auth provider
    pub user_password: Option<Secret>,

    /// Directory holding cached auth storage states
    pub auth_dir: PathBuf,

    /// Per-request HTTP timeout
    pub request_timeout_ms: u64,

    /// Default poll budget for fixtures
    pub poll_timeout_ms: u64,

    /// Default poll interval for fixtures
    pub poll_interval_ms: u64,

    /// Health endpoint probed by global setup
    pub health_path: String,

    /// Budget for the API to become healthy during global setup
    pub startup_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            environment: "local".to_string(),
            user_email: None,
            user_password: None,
            auth_dir: PathBuf::from("tests/support/auth/sessions"),
            request_timeout_ms: 30_000,
            poll_timeout_ms: 30_000,
            poll_interval_ms: 1_000,
            health_path: "/health".to_string(),
            startup_timeout_ms: 30_000,
        }
    }
}

impl TestConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// YAML file (if any) overlaid with the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = v;
        }
        if let Some(v) = get(ENV_TEST_ENV) {
            self.environment = v;
        }
        if let Some(v) = get(ENV_USER_EMAIL) {
            self.user_email = Some(v);
        }
        if let Some(v) = get(ENV_USER_PASSWORD) {
            self.user_password = Some(Secret::new(v));
        }
        if let Some(v) = get(ENV_AUTH_DIR) {
            self.auth_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_HEALTH_PATH) {
            self.health_path = v;
        }
        if let Some(v) = get(ENV_POLL_TIMEOUT_MS) {
            self.poll_timeout_ms = parse_ms(ENV_POLL_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = get(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_ms(ENV_POLL_INTERVAL_MS, &v)?;
        }
        if let Some(v) = get(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout_ms = parse_ms(ENV_REQUEST_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = get(ENV_STARTUP_TIMEOUT_MS) {
            self.startup_timeout_ms = parse_ms(ENV_STARTUP_TIMEOUT_MS, &v)?;
        }

        Ok(())
    }

    /// Reject values that would only fail later, far from their source
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(Error::InvalidConfig("environment must not be empty".to_string()));
        }
        if !self.health_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "health_path must start with '/', got '{}'",
                self.health_path
            )));
        }
        Ok(())
    }

    /// Login credentials, required by the API auth provider
    pub fn credentials(&self) -> Result<(&str, &Secret)> {
        match (&self.user_email, &self.user_password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Ok((email.as_str(), password))
            }
            _ => Err(Error::MissingCredentials),
        }
    }

    /// Base URL joined with `path`, without doubled slashes
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    /// Poll options built from the configured defaults
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::default()
            .with_timeout_ms(self.poll_timeout_ms)
            .with_interval_ms(self.poll_interval_ms)
    }
}

fn parse_ms(key: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        Error::InvalidConfig(format!(
            "{} must be a non-negative integer number of milliseconds, got '{}'",
            key, value
        ))
    })
}
