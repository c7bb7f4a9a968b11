//! `testkit wait`: poll a URL until it answers the way you expect

use clap::Args;
use serde_json::Value;
use tracing::debug;

use testkit_common::{recurse, PollError, TestConfig};

use crate::output::{print_error, print_success};

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// URL to poll; a path is resolved against the configured base URL
    pub url: String,

    /// Status code that counts as ready
    #[arg(long, default_value = "200")]
    pub status: u16,

    /// Dotted path into the JSON body that must be present (e.g. `job.status`)
    #[arg(long)]
    pub json_field: Option<String>,

    /// Value the JSON field must equal
    #[arg(long, requires = "json_field")]
    pub equals: Option<String>,

    /// Total time budget (defaults to the configured poll timeout)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Delay between attempts (defaults to the configured poll interval)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// What a single attempt observed
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub status: Option<u16>,
    pub body: Value,
}

impl WaitArgs {
    fn target(&self, config: &TestConfig) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            config.url(&self.url)
        }
    }

    /// Whether an observation satisfies the status and field conditions
    pub fn is_ready(&self, observation: &Observation) -> bool {
        if observation.status != Some(self.status) {
            return false;
        }

        let Some(field) = &self.json_field else {
            return true;
        };

        match lookup(&observation.body, field) {
            None | Some(Value::Null) => false,
            Some(value) => match &self.equals {
                None => true,
                Some(expected) => match value {
                    Value::String(s) => s == expected,
                    other => other.to_string() == *expected,
                },
            },
        }
    }
}

/// Resolve `a.b.0.c` inside a JSON value
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let pointer = format!("/{}", path.replace('~', "~0").replace('/', "~1").replace('.', "/"));
    value.pointer(&pointer)
}

/// Returns `Ok(false)` when the condition was not met in time
pub async fn execute(args: WaitArgs, config: &TestConfig) -> anyhow::Result<bool> {
    let url = args.target(config);
    let options = config
        .poll_options()
        .with_timeout_ms(args.timeout_ms.unwrap_or(config.poll_timeout_ms))
        .with_interval_ms(args.interval_ms.unwrap_or(config.poll_interval_ms));
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    let mut attempts = 0u32;
    let result = recurse(
        || {
            attempts += 1;
            let attempt = attempts;
            let client = client.clone();
            let url = url.clone();
            async move { observe(&client, &url, attempt).await }
        },
        |observation| args.is_ready(observation),
        options,
    )
    .await;

    match result {
        Ok(observation) => {
            print_success(&format!(
                "{} ready after {} attempt(s) (status {})",
                url,
                attempts,
                observation.status.unwrap_or_default()
            ));
            Ok(true)
        }
        Err(e @ PollError::Timeout { .. }) => {
            print_error(&format!("{} ({} attempt(s) against {})", e, attempts, url));
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// One GET; connection failures count as "not up yet"
async fn observe(client: &reqwest::Client, url: &str, attempt: u32) -> Result<Observation, reqwest::Error> {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            let text = response.text().await?;
            debug!("Attempt {}: {} -> {}", attempt, url, status);
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            Ok(Observation {
                status: Some(status),
                body,
            })
        }
        Err(e) if e.is_connect() || e.is_timeout() => {
            debug!("Attempt {}: {} unreachable: {}", attempt, url, e);
            Ok(Observation {
                status: None,
                body: Value::Null,
            })
        }
        Err(e) => Err(e),
    }
}
