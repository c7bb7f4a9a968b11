//! Network error monitor
//!
//! Collects every 4xx/5xx response the API client sees so a test fails at
//! teardown on HTTP errors it did not explicitly expect.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::error::{E2eError, E2eResult};

/// One failed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkError {
    pub method: String,
    pub url: String,
    pub status: u16,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.url, self.status)
    }
}

#[derive(Debug)]
struct MonitorState {
    enabled: bool,
    allowed: HashSet<u16>,
    errors: Vec<NetworkError>,
}

/// Shared handle; clones observe the same error list
#[derive(Debug, Clone)]
pub struct NetworkErrorMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl Default for NetworkErrorMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkErrorMonitor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState {
                enabled: true,
                allowed: HashSet::new(),
                errors: Vec::new(),
            })),
        }
    }

    /// Record a response. Statuses below 400, allowed statuses, and
    /// everything while disabled are ignored.
    pub fn record(&self, method: &str, url: &str, status: u16) {
        if status < 400 {
            return;
        }
        let mut state = self.state.lock();
        if !state.enabled || state.allowed.contains(&status) {
            return;
        }
        warn!("HTTP {} from {} {}", status, method, url);
        state.errors.push(NetworkError {
            method: method.to_string(),
            url: url.to_string(),
            status,
        });
    }

    /// Treat `status` as expected for the rest of the test
    pub fn allow_status(&self, status: u16) {
        self.state.lock().allowed.insert(status);
    }

    pub fn disable(&self) {
        self.state.lock().enabled = false;
    }

    pub fn enable(&self) {
        self.state.lock().enabled = true;
    }

    pub fn errors(&self) -> Vec<NetworkError> {
        self.state.lock().errors.clone()
    }

    pub fn clear(&self) {
        self.state.lock().errors.clear();
    }

    /// Fail with every unexpected error recorded so far
    pub fn check(&self) -> E2eResult<()> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(E2eError::NetworkErrors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_only_error_statuses() {
        let monitor = NetworkErrorMonitor::new();
        monitor.record("GET", "http://localhost/ok", 200);
        monitor.record("GET", "http://localhost/redirect", 302);
        monitor.record("GET", "http://localhost/missing", 404);

        let errors = monitor.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].status, 404);
        assert!(monitor.check().is_err());
    }

    #[test]
    fn test_allowed_status_is_ignored() {
        let monitor = NetworkErrorMonitor::new();
        monitor.allow_status(401);
        monitor.record("GET", "http://localhost/api/me", 401);
        assert!(monitor.check().is_ok());
    }

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = NetworkErrorMonitor::new();
        monitor.disable();
        monitor.record("POST", "http://localhost/api/jobs", 500);
        assert!(monitor.errors().is_empty());

        monitor.enable();
        monitor.record("POST", "http://localhost/api/jobs", 500);
        assert_eq!(monitor.errors().len(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let monitor = NetworkErrorMonitor::new();
        let handle = monitor.clone();
        handle.record("DELETE", "http://localhost/api/users/1", 500);
        assert_eq!(monitor.errors().len(), 1);

        monitor.clear();
        assert!(handle.check().is_ok());
    }
}
