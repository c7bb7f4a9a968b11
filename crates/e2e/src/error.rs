//! Error types for E2E testing

use testkit_common::PollError;
use thiserror::Error;

use crate::monitor::NetworkError;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(#[from] testkit_common::Error),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Request failed: {method} {url} returned {status}: {body}")]
    RequestFailed {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Authentication failed: {status} {body}")]
    AuthFailed { status: u16, body: String },

    #[error("Invalid auth response: {0}")]
    InvalidAuthResponse(String),

    #[error("Poll timeout: condition not satisfied within {timeout_ms}ms")]
    PollTimeout { timeout_ms: u64 },

    #[error("Poll cancelled before condition was satisfied")]
    Cancelled,

    #[error("Unexpected HTTP errors during test: {}", describe(.0))]
    NetworkErrors(Vec<NetworkError>),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

impl From<PollError<E2eError>> for E2eError {
    fn from(e: PollError<E2eError>) -> Self {
        match e {
            PollError::Timeout { timeout } => E2eError::PollTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            PollError::Probe(inner) => inner,
            PollError::Cancelled => E2eError::Cancelled,
        }
    }
}

fn describe(errors: &[NetworkError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
