//! TestContext composition and teardown against the in-process mock API

mod support;

use serde_json::Value;

use testkit_e2e::{global_setup, global_teardown, E2eError, SetupOptions, TeardownOptions, TestContext};

use support::{MockServer, MockState};

#[tokio::test]
async fn seeded_user_is_deleted_after_success() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::setup(server.config(dir.path())).await.unwrap();

    let seen = ctx
        .with_test_user(true, |user| {
            let api = ctx.api.clone();
            async move {
                let fetched = api.get::<Value>(&format!("/api/users/{}", user.id)).await?;
                Ok::<_, E2eError>(fetched.status)
            }
        })
        .await
        .unwrap();

    assert_eq!(seen, 200);
    assert_eq!(server.user_count(), 0);
    ctx.teardown().await.unwrap();
}

#[tokio::test]
async fn seeded_user_is_deleted_after_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::setup(server.config(dir.path())).await.unwrap();

    let err = ctx
        .with_test_user(true, |_user| async {
            Err::<(), _>(E2eError::AssertionFailed("expected status 201".to_string()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::AssertionFailed(_)));
    assert_eq!(server.user_count(), 0);
    ctx.teardown().await.unwrap();
}

#[tokio::test]
async fn teardown_fails_on_unexpected_server_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::setup(server.config(dir.path())).await.unwrap();

    let response = ctx.api.get::<Value>("/api/fail").await.unwrap();
    assert_eq!(response.status, 500);

    let err = ctx.teardown().await.unwrap_err();
    match err {
        E2eError::NetworkErrors(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].method, "GET");
            assert_eq!(errors[0].status, 500);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn allowed_status_keeps_teardown_clean() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::setup(server.config(dir.path())).await.unwrap();

    ctx.monitor.allow_status(401);
    let response = ctx.api.get::<Value>("/api/me").await.unwrap();
    assert_eq!(response.status, 401);

    ctx.teardown().await.unwrap();
}

#[tokio::test]
async fn context_poller_writes_to_context_log() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::setup(server.config(dir.path())).await.unwrap();

    ctx.log
        .run_step("Wait for health", ctx.recurse.wait_for(|| {
            let api = ctx.api.clone();
            async move { Ok::<_, E2eError>(api.get::<Value>("/health").await?.is_success()) }
        }))
        .await
        .unwrap();

    let labels: Vec<String> = ctx.log.steps().into_iter().map(|s| s.label).collect();
    assert_eq!(labels, vec!["Poll attempt 1", "Wait for health"]);
    assert!(ctx.log.failed_steps().is_empty());
    ctx.teardown().await.unwrap();
}

#[tokio::test]
async fn global_setup_waits_and_teardown_clears_sessions() {
    let server = MockServer::start_with(MockState {
        healthy_after: 2,
        ..Default::default()
    })
    .await;
    let dir = tempfile::tempdir().unwrap();
    let config = server.config(&dir.path().join("sessions"));

    global_setup(&config, &SetupOptions { wait_for_api: true })
        .await
        .unwrap();
    assert!(config.auth_dir.is_dir());
    assert_eq!(server.state.lock().health_hits, 3);

    let ctx = TestContext::setup(config.clone()).await.unwrap();
    ctx.auth.token(&Default::default()).await.unwrap();
    ctx.teardown().await.unwrap();

    global_teardown(&config, &TeardownOptions { clear_sessions: true })
        .await
        .unwrap();
    assert!(!config.auth_dir.exists());
}
