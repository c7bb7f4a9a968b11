//! Global setup and teardown, run once per test session

use std::time::Duration;

use tracing::{info, warn};

use testkit_common::{recurse, PollError, PollOptions, TestConfig};

use crate::auth::TokenStore;
use crate::error::{E2eError, E2eResult};

/// Gap between health probes while waiting for the API
const HEALTH_INTERVAL: Duration = Duration::from_millis(100);

/// Per-probe budget, kept short so a hung connection cannot eat the startup window
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Block until `{base_url}{health_path}` answers 2xx
    pub wait_for_api: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TeardownOptions {
    /// Remove every cached auth session
    pub clear_sessions: bool,
}

pub async fn global_setup(config: &TestConfig, options: &SetupOptions) -> E2eResult<()> {
    info!("Global setup: {} ({})", config.base_url, config.environment);

    tokio::fs::create_dir_all(&config.auth_dir).await?;

    if options.wait_for_api {
        wait_for_api(config).await?;
    }

    info!("Global setup complete");
    Ok(())
}

/// Poll the health endpoint until it answers 2xx or the startup budget runs out.
///
/// Connection errors count as "not up yet", not as failures.
pub async fn wait_for_api(config: &TestConfig) -> E2eResult<()> {
    let health_url = config.url(&config.health_path);
    let client = reqwest::Client::builder()
        .timeout(HEALTH_REQUEST_TIMEOUT)
        .build()?;

    info!("Waiting for API at {}", health_url);

    let mut attempts = 0usize;
    let result = recurse(
        || {
            attempts += 1;
            let first = attempts == 1;
            let client = client.clone();
            let url = health_url.clone();
            async move {
                match client.get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => Ok::<bool, E2eError>(true),
                    Ok(resp) => {
                        warn!("Health check returned {}", resp.status());
                        Ok(false)
                    }
                    Err(e) => {
                        if first {
                            info!("Waiting for API to start...");
                        }
                        if !e.is_connect() {
                            warn!("Health check error: {}", e);
                        }
                        Ok(false)
                    }
                }
            }
        },
        |healthy| *healthy,
        PollOptions::new(config.startup_timeout(), HEALTH_INTERVAL),
    )
    .await;

    match result {
        Ok(_) => {
            info!("API is healthy at {}", health_url);
            Ok(())
        }
        Err(PollError::Timeout { .. }) => Err(E2eError::ServerHealthCheck(attempts)),
        Err(e) => Err(e.into()),
    }
}

pub async fn global_teardown(config: &TestConfig, options: &TeardownOptions) -> E2eResult<()> {
    if options.clear_sessions {
        let store = TokenStore::from_config(std::sync::Arc::new(config.clone()))?;
        store.clear_all().await?;
        info!("Cleared auth sessions in {}", config.auth_dir.display());
    }

    info!("Global teardown complete");
    Ok(())
}
