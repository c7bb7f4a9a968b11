//! Poller timing against the real clock
//!
//! The unit tests in `poll.rs` run on paused time; these check the same
//! bounds with real scheduler jitter in play.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use testkit_common::poll::{recurse, PollOptions};

#[tokio::test]
async fn timeout_lands_near_configured_budget() {
    let start = Instant::now();

    let err = recurse(
        || async { Ok::<_, Infallible>("pending") },
        |v| *v == "done",
        PollOptions::default().with_timeout_ms(300).with_interval_ms(50),
    )
    .await
    .unwrap_err();

    let elapsed = start.elapsed();
    assert!(err.to_string().contains("300ms"));
    assert!(
        elapsed >= Duration::from_millis(250) && elapsed <= Duration::from_millis(600),
        "elapsed {:?} outside [250ms, 600ms]",
        elapsed
    );
}

#[tokio::test]
async fn interval_limits_number_of_attempts() {
    let calls = Arc::new(AtomicU32::new(0));

    let err = recurse(
        || {
            let calls = Arc::clone(&calls);
            async move { Ok::<_, Infallible>(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        },
        |_| false,
        PollOptions::default().with_timeout_ms(250).with_interval_ms(100),
    )
    .await
    .unwrap_err();

    assert!(err.to_string().to_lowercase().contains("timeout"));
    let calls = calls.load(Ordering::SeqCst);
    assert!((2..=4).contains(&calls), "expected 2-4 attempts, got {}", calls);
}

#[tokio::test]
async fn probe_error_returns_before_interval() {
    let start = Instant::now();

    let err = recurse(
        || async { Err::<u32, _>(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")) },
        |_| true,
        PollOptions::default().with_interval_ms(5_000),
    )
    .await
    .unwrap_err();

    assert!(start.elapsed() < Duration::from_millis(1_000));
    let source = err.into_probe_error().unwrap();
    assert_eq!(source.kind(), std::io::ErrorKind::ConnectionRefused);
}
