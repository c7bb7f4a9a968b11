//! testkit E2E API Test Framework
//!
//! This crate provides the building blocks for API-level end-to-end tests:
//! - An HTTP client that reports unexpected 4xx/5xx responses
//! - Token sessions acquired over the API and cached on disk
//! - Test data factories for users
//! - A condition poller bound to configured defaults
//! - Global setup/teardown that waits for the API to come up
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TestContext (per test)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  api: ApiClient ───────────────► monitor: NetworkErrorMonitor│
//! │    ├── request(ApiRequest) -> ApiResponse<T>                │
//! │    └── seed_user / delete_user                              │
//! │  auth: TokenStore                                           │
//! │    ├── token(AuthOptions) -> cached or fresh token          │
//! │    └── AuthProvider (ApiAuthProvider: POST /api/auth/login) │
//! │  recurse: Poller ──────────────► log: StepLog               │
//! │    └── recurse / wait_for (testkit_common::poll)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  teardown(): reverse order, fails on unexpected HTTP errors │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod factory;
pub mod fixtures;
pub mod log;
pub mod monitor;
pub mod setup;

pub use api::{ApiClient, ApiRequest, ApiResponse};
pub use auth::{ApiAuthProvider, AuthOptions, AuthProvider, StorageState, TokenStore};
pub use error::{E2eError, E2eResult};
pub use factory::{create_admin_user, create_inactive_user, create_user, Role, User, UserOverrides};
pub use fixtures::{Fixture, Poller, TestContext};
pub use log::StepLog;
pub use monitor::{NetworkError, NetworkErrorMonitor};
pub use setup::{global_setup, global_teardown, wait_for_api, SetupOptions, TeardownOptions};
