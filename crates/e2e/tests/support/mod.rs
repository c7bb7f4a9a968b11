//! In-process mock of the API under test
//!
//! Serves the endpoints the fixtures talk to on an ephemeral port and keeps
//! enough state for tests to assert on what the client did.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use testkit_common::{Secret, TestConfig};

pub const EMAIL: &str = "tester@example.com";
pub const PASSWORD: &str = "s3cret-password";

/// Job polls needed before a job reports `completed`
pub const JOB_POLLS_TO_COMPLETE: u32 = 3;

#[derive(Default)]
pub struct MockState {
    pub health_hits: u32,
    /// `/health` answers 503 until it has been hit more than this many times
    pub healthy_after: u32,
    pub users: HashMap<String, Value>,
    pub logins: u32,
    pub jobs: HashMap<String, u32>,
    pub next_job: u32,
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        Self::start_with(MockState::default()).await
    }

    pub async fn start_with(state: MockState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let app = router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Config pointing at this server, with valid credentials
    pub fn config(&self, auth_dir: &Path) -> TestConfig {
        TestConfig {
            base_url: self.base_url.clone(),
            user_email: Some(EMAIL.to_string()),
            user_password: Some(Secret::new(PASSWORD)),
            auth_dir: auth_dir.to_path_buf(),
            poll_timeout_ms: 2_000,
            poll_interval_ms: 10,
            startup_timeout_ms: 2_000,
            ..Default::default()
        }
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }

    pub fn logins(&self) -> u32 {
        self.state.lock().logins
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

type Shared = Arc<Mutex<MockState>>;

fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user).delete(delete_user))
        .route("/api/auth/login", post(login))
        .route("/api/me", get(me))
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/:id", get(get_job))
        .route("/api/fail", get(fail))
        .with_state(state)
}

async fn health(State(state): State<Shared>) -> Response {
    let mut state = state.lock();
    state.health_hits += 1;
    if state.health_hits > state.healthy_after {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting").into_response()
    }
}

async fn create_user(State(state): State<Shared>, Json(user): Json<Value>) -> Response {
    let Some(id) = user["id"].as_str().map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, "missing id").into_response();
    };
    state.lock().users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn get_user(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    match state.lock().users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "user not found" }))).into_response(),
    }
}

async fn delete_user(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> StatusCode {
    match state.lock().users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] != EMAIL || body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, "invalid credentials").into_response();
    }
    let mut state = state.lock();
    state.logins += 1;
    Json(json!({ "token": format!("token-{}", state.logins), "expiresIn": 3600 })).into_response()
}

async fn me(headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer token-"))
        .unwrap_or(false);

    if authorized {
        Json(json!({ "email": EMAIL })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
    }
}

async fn create_job(State(state): State<Shared>) -> Response {
    let mut state = state.lock();
    state.next_job += 1;
    let id = format!("job-{}", state.next_job);
    state.jobs.insert(id.clone(), 0);
    (StatusCode::ACCEPTED, Json(json!({ "id": id, "status": "pending" }))).into_response()
}

async fn get_job(State(state): State<Shared>, UrlPath(id): UrlPath<String>) -> Response {
    let mut state = state.lock();
    let Some(polls) = state.jobs.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *polls += 1;

    let body = if *polls >= JOB_POLLS_TO_COMPLETE {
        json!({ "id": id, "status": "completed", "result": { "rows": 42 } })
    } else {
        json!({ "id": id, "status": "running" })
    };
    Json(body).into_response()
}

async fn fail() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}
