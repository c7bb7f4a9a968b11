//! HTTP API client for tests
//!
//! Thin layer over `reqwest` that resolves paths against the configured base
//! URL, decodes JSON bodies, attaches bearer tokens, and reports 4xx/5xx
//! responses to the network error monitor.

use std::collections::HashSet;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use testkit_common::redact::redact_json;
use testkit_common::TestConfig;

use crate::error::{E2eError, E2eResult};
use crate::factory::{create_user, User, UserOverrides};
use crate::monitor::NetworkErrorMonitor;

/// A request relative to the API base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Overrides the client's token for this request
    pub bearer: Option<String>,
    /// Error statuses the monitor should not flag for this request
    pub expected_statuses: HashSet<u16>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            bearer: None,
            expected_statuses: HashSet::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> E2eResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Do not report `status` to the monitor for this request
    pub fn expect_status(mut self, status: u16) -> Self {
        self.expected_statuses.insert(status);
        self
    }
}

/// Decoded response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: T,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// API client bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    monitor: Option<NetworkErrorMonitor>,
}

impl ApiClient {
    pub fn new(config: &TestConfig) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
            monitor: None,
        })
    }

    /// Send `Authorization: Bearer <token>` on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_monitor(mut self, monitor: NetworkErrorMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request` and decode the body as `T`.
    ///
    /// Non-2xx statuses are returned, not raised; callers decide what a
    /// failure means. An empty body decodes from JSON `null`, a non-JSON body
    /// from a JSON string.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> E2eResult<ApiResponse<T>> {
        let url = self.url(&request.path);

        match &request.body {
            Some(body) => debug!("{} {} body={}", request.method, url, redact_json(body)),
            None => debug!("{} {}", request.method, url),
        }

        let mut builder = self.http.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = request.bearer.as_ref().or(self.token.as_ref()) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;

        debug!("{} {} -> {}", request.method, url, status);

        if let Some(monitor) = &self.monitor {
            if !request.expected_statuses.contains(&status) {
                monitor.record(request.method.as_str(), &url, status);
            }
        }

        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        let body = serde_json::from_value(value)?;

        Ok(ApiResponse { status, headers, body })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> E2eResult<ApiResponse<T>> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> E2eResult<ApiResponse<T>> {
        self.request(ApiRequest::post(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> E2eResult<ApiResponse<T>> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Generate a user and create it through `POST /api/users`
    pub async fn seed_user(&self, overrides: UserOverrides) -> E2eResult<User> {
        let user = create_user(overrides);
        self.create_user(&user).await?;
        Ok(user)
    }

    /// Create an already-built user through `POST /api/users`
    pub async fn create_user(&self, user: &User) -> E2eResult<()> {
        let response: ApiResponse<Value> = self.post("/api/users", user).await?;
        if !response.is_success() {
            return Err(self.failure("POST", "/api/users", response));
        }
        Ok(())
    }

    /// Delete a user; a 404 counts as already deleted
    pub async fn delete_user(&self, id: &Uuid) -> E2eResult<()> {
        let path = format!("/api/users/{}", id);
        let response: ApiResponse<Value> = self
            .request(ApiRequest::delete(path.as_str()).expect_status(404))
            .await?;

        if !response.is_success() && response.status != 404 {
            return Err(self.failure("DELETE", &path, response));
        }
        Ok(())
    }

    fn failure(&self, method: &str, path: &str, response: ApiResponse<Value>) -> E2eError {
        let body = match response.body {
            Value::String(s) => s,
            other => other.to_string(),
        };
        E2eError::RequestFailed {
            method: method.to_string(),
            url: self.url(path),
            status: response.status,
            body,
        }
    }
}
