//! testkit Common Library
//!
//! Shared primitives for the testkit crates:
//! - [`poll`]: the async condition poller (`recurse` / `wait_for`)
//! - [`config`]: explicit test configuration assembled once per process
//! - [`logging`]: tracing subscriber setup
//! - [`redact`]: secret handling for logs and terminal output

pub mod config;
pub mod error;
pub mod logging;
pub mod poll;
pub mod redact;

// Re-export commonly used types
pub use config::TestConfig;
pub use error::{Error, Result};
pub use logging::{init_logging, LoggingConfig};
pub use poll::{recurse, wait_for, PollError, PollOptions};
pub use redact::Secret;

/// testkit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
