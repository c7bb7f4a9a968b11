//! Condition polling
//!
//! `recurse` repeatedly invokes an async probe and hands each result to a
//! predicate until the predicate accepts it or the time budget runs out.
//!
//! # Timing
//! ```text
//! t0 ─ probe ─ predicate ─ sleep(interval) ─ elapsed >= timeout? ─ probe ─ ...
//! ```
//!
//! - The probe always runs at least once, even with a zero timeout.
//! - No probe starts once `timeout` has elapsed since `t0`.
//! - The idle gap between two probes is at least `interval`; probe and
//!   predicate time is not subtracted from it.
//! - A probe error ends the poll immediately and is returned unchanged.
//!
//! The poller does not log. Callers that want per-attempt reporting wrap the
//! probe themselves.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

/// Default total budget for a poll (30 seconds)
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default delay between probe invocations (1 second)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Options for a single poll
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Total wall-clock budget, measured from the start of the call
    pub timeout: Duration,

    /// Idle gap between the end of one attempt and the start of the next
    pub interval: Duration,

    /// Stops the poll early when cancelled
    pub cancel: Option<CancellationToken>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: None,
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            cancel: None,
        }
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_interval_ms(mut self, ms: u64) -> Self {
        self.interval = Duration::from_millis(ms);
        self
    }

    /// Attach a token that aborts the poll while it awaits the probe or sleeps
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Why a poll did not produce a value
#[derive(Debug)]
pub enum PollError<E> {
    /// The budget ran out before the predicate accepted a result
    Timeout { timeout: Duration },

    /// The probe failed; the poll was not retried
    Probe(E),

    /// The caller's cancellation token fired
    Cancelled,
}

impl<E> PollError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// The configured budget, for timeout errors
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            PollError::Timeout { timeout } => Some(*timeout),
            _ => None,
        }
    }

    /// The probe's own error, for probe failures
    pub fn into_probe_error(self) -> Option<E> {
        match self {
            PollError::Probe(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for PollError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Timeout { timeout } => write!(
                f,
                "Poll timeout: condition not satisfied within {}ms",
                timeout.as_millis()
            ),
            // Probe errors surface exactly as the probe produced them
            PollError::Probe(e) => e.fmt(f),
            PollError::Cancelled => write!(f, "Poll cancelled before condition was satisfied"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for PollError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::Probe(e) => e.source(),
            _ => None,
        }
    }
}

/// Poll `probe` until `predicate` accepts its result.
///
/// Returns the accepted value untouched. Fails with [`PollError::Timeout`]
/// once `options.timeout` has elapsed without a match, with
/// [`PollError::Probe`] as soon as the probe errors, and with
/// [`PollError::Cancelled`] if the options' token fires.
pub async fn recurse<T, E, F, Fut, P>(
    mut probe: F,
    predicate: P,
    options: PollOptions,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let cancel = options.cancel.as_ref();

    loop {
        let value = until_cancelled(cancel, probe())
            .await
            .ok_or(PollError::Cancelled)?
            .map_err(PollError::Probe)?;

        if predicate(&value) {
            return Ok(value);
        }

        until_cancelled(cancel, sleep(options.interval))
            .await
            .ok_or(PollError::Cancelled)?;

        if start.elapsed() >= options.timeout {
            return Err(PollError::Timeout {
                timeout: options.timeout,
            });
        }
    }
}

/// Poll a boolean probe until it reports `true`.
///
/// Same timing and errors as [`recurse`].
pub async fn wait_for<E, F, Fut>(probe: F, options: PollOptions) -> Result<(), PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    recurse(probe, |ready| *ready, options).await.map(|_| ())
}

async fn until_cancelled<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => None,
            output = fut => Some(output),
        },
        None => Some(fut.await),
    }
}
