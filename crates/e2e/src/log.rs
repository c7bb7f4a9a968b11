//! Step log
//!
//! Labelled test steps, echoed through `tracing` and kept for reporting.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

/// A recorded step
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub label: String,
    pub started_at: DateTime<Utc>,
    /// Set for steps that wrapped an operation
    pub duration_ms: Option<u64>,
    pub success: bool,
    pub error: Option<String>,
}

/// Shared handle; clones append to the same log
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Arc<Mutex<Vec<Step>>>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a step
    pub fn step(&self, label: impl Into<String>) {
        let label = label.into();
        info!("[STEP] {}", label);
        self.steps.lock().push(Step {
            label,
            started_at: Utc::now(),
            duration_ms: None,
            success: true,
            error: None,
        });
    }

    /// Run `operation` as a timed step and record how it ended
    pub async fn run_step<T, E, F>(&self, label: impl Into<String>, operation: F) -> Result<T, E>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let label = label.into();
        let started_at = Utc::now();
        let start = Instant::now();
        info!("[STEP] {}", label);

        let result = operation.await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match &result {
            Ok(_) => {
                info!("✓ {} ({} ms)", label, duration_ms);
                None
            }
            Err(e) => {
                warn!("✗ {} - {}", label, e);
                Some(e.to_string())
            }
        };

        self.steps.lock().push(Step {
            label,
            started_at,
            duration_ms: Some(duration_ms),
            success: error.is_none(),
            error,
        });

        result
    }

    pub fn info(&self, message: &str) {
        info!("[TEST LOG] {}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[TEST LOG] {}", message);
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().clone()
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.steps.lock().iter().filter(|s| !s.success).cloned().collect()
    }
}
