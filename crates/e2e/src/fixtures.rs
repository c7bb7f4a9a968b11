//! Test fixtures
//!
//! Each capability a test can ask for implements [`Fixture`]. A
//! [`TestContext`] composes one of each, wired together: the API client
//! reports to the monitor and the poller writes to the step log.
//!
//! ```no_run
//! use testkit_e2e::fixtures::TestContext;
//! use testkit_common::TestConfig;
//!
//! # async fn run() -> testkit_e2e::E2eResult<()> {
//! let ctx = TestContext::setup(TestConfig::from_env()?).await?;
//!
//! ctx.log.step("Poll job until complete");
//! let _job: serde_json::Value = ctx
//!     .recurse
//!     .recurse(
//!         || async {
//!             let job = ctx.api.get::<serde_json::Value>("/api/jobs/1").await?;
//!             Ok::<_, testkit_e2e::E2eError>(job.body)
//!         },
//!         |job| job["status"] == "completed",
//!     )
//!     .await?;
//!
//! ctx.teardown().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use testkit_common::{recurse, PollOptions, TestConfig};

use crate::api::ApiClient;
use crate::auth::{AuthOptions, TokenStore};
use crate::error::{E2eError, E2eResult};
use crate::factory::{create_user, User, UserOverrides};
use crate::log::StepLog;
use crate::monitor::NetworkErrorMonitor;

/// A per-test capability with explicit setup and teardown
#[async_trait]
pub trait Fixture: Send + Sized {
    fn name(&self) -> &'static str;

    async fn setup(config: Arc<TestConfig>) -> E2eResult<Self>;

    async fn teardown(&mut self) -> E2eResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Fixture for ApiClient {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn setup(config: Arc<TestConfig>) -> E2eResult<Self> {
        ApiClient::new(&config)
    }
}

#[async_trait]
impl Fixture for TokenStore {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn setup(config: Arc<TestConfig>) -> E2eResult<Self> {
        TokenStore::from_config(config)
    }
}

#[async_trait]
impl Fixture for StepLog {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn setup(_config: Arc<TestConfig>) -> E2eResult<Self> {
        Ok(StepLog::new())
    }

    async fn teardown(&mut self) -> E2eResult<()> {
        for step in self.failed_steps() {
            warn!(
                "Failed step: {} ({})",
                step.label,
                step.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Fixture for NetworkErrorMonitor {
    fn name(&self) -> &'static str {
        "network-error-monitor"
    }

    async fn setup(_config: Arc<TestConfig>) -> E2eResult<Self> {
        Ok(NetworkErrorMonitor::new())
    }

    async fn teardown(&mut self) -> E2eResult<()> {
        let result = self.check();
        self.clear();
        result
    }
}

/// Poller bound to the configured defaults, logging each attempt
#[derive(Debug, Clone)]
pub struct Poller {
    defaults: PollOptions,
    log: StepLog,
}

#[async_trait]
impl Fixture for Poller {
    fn name(&self) -> &'static str {
        "recurse"
    }

    async fn setup(config: Arc<TestConfig>) -> E2eResult<Self> {
        Ok(Poller::new(config.poll_options(), StepLog::new()))
    }
}

impl Poller {
    pub fn new(defaults: PollOptions, log: StepLog) -> Self {
        Self { defaults, log }
    }

    pub fn defaults(&self) -> &PollOptions {
        &self.defaults
    }

    /// Poll with the default timeout and interval
    pub async fn recurse<T, F, Fut, P>(&self, probe: F, predicate: P) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<T>>,
        P: Fn(&T) -> bool,
    {
        self.recurse_with(probe, predicate, self.defaults.clone()).await
    }

    pub async fn recurse_with<T, F, Fut, P>(
        &self,
        mut probe: F,
        predicate: P,
        options: PollOptions,
    ) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<T>>,
        P: Fn(&T) -> bool,
    {
        let mut attempt = 0u32;
        let log = self.log.clone();

        let result = recurse(
            || {
                attempt += 1;
                log.step(format!("Poll attempt {}", attempt));
                probe()
            },
            predicate,
            options,
        )
        .await;

        match &result {
            Ok(_) => log.info(&format!("Condition met after {} attempt(s)", attempt)),
            Err(e) => log.warn(&format!("Polling stopped after {} attempt(s): {}", attempt, e)),
        }

        result.map_err(E2eError::from)
    }

    /// Poll a boolean probe with the default options
    pub async fn wait_for<F, Fut>(&self, probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<bool>>,
    {
        self.recurse(probe, |ready| *ready).await.map(|_| ())
    }
}

/// Everything a single test needs, torn down together
#[derive(Debug)]
pub struct TestContext {
    pub config: Arc<TestConfig>,
    pub monitor: NetworkErrorMonitor,
    pub log: StepLog,
    pub api: ApiClient,
    pub auth: TokenStore,
    pub recurse: Poller,
}

impl TestContext {
    pub async fn setup(config: TestConfig) -> E2eResult<Self> {
        let config = Arc::new(config);

        let monitor = NetworkErrorMonitor::setup(config.clone()).await?;
        let log = StepLog::setup(config.clone()).await?;
        let api = ApiClient::setup(config.clone())
            .await?
            .with_monitor(monitor.clone());
        let auth = TokenStore::setup(config.clone()).await?;
        let recurse = Poller::new(config.poll_options(), log.clone());

        Ok(Self {
            config,
            monitor,
            log,
            api,
            auth,
            recurse,
        })
    }

    /// Copy of the API client carrying a bearer token for `options`
    pub async fn authenticated_api(&self, options: &AuthOptions) -> E2eResult<ApiClient> {
        let token = self.auth.token(options).await?;
        Ok(self.api.clone().with_token(token))
    }

    /// Run `f` with a fresh user.
    ///
    /// With `seed` the user is created through the API first and deleted
    /// afterwards, whether `f` succeeded or not. Otherwise it only exists
    /// in memory.
    pub async fn with_test_user<T, F, Fut>(&self, seed: bool, f: F) -> E2eResult<T>
    where
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = E2eResult<T>>,
    {
        let user = if seed {
            self.api.seed_user(UserOverrides::default()).await?
        } else {
            create_user(UserOverrides::default())
        };
        let id = user.id;

        let result = f(user).await;

        if !seed {
            return result;
        }

        let cleanup = self.api.delete_user(&id).await;
        match (result, cleanup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_err)) => {
                warn!("Cleanup of user {} failed: {}", id, cleanup_err);
                Err(e)
            }
        }
    }

    /// Tear fixtures down in reverse order of setup.
    ///
    /// Every fixture is torn down even if an earlier one fails; the first
    /// failure is returned.
    pub async fn teardown(mut self) -> E2eResult<()> {
        let mut first_error = None;
        let mut note = |name: &str, result: E2eResult<()>| {
            if let Err(e) = result {
                warn!("Teardown of {} failed: {}", name, e);
                first_error.get_or_insert(e);
            }
        };

        let name = self.recurse.name();
        note(name, self.recurse.teardown().await);
        let name = self.auth.name();
        note(name, self.auth.teardown().await);
        let name = self.api.name();
        note(name, self.api.teardown().await);
        let name = self.log.name();
        note(name, self.log.teardown().await);
        let name = self.monitor.name();
        note(name, self.monitor.teardown().await);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
