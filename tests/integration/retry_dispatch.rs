//! Dispatcher retry behavior over a scripted transport.

use super::test_utils::{Step, StubTransport};
use scenecard::dispatch::{dispatch, RetryPolicy};
use scenecard::error::PipelineError;
use scenecard::provider::{ChatEndpoint, ChatMessage, ChatRequest};
use std::time::Duration;

fn endpoint() -> ChatEndpoint {
    ChatEndpoint::custom(
        "https://chat.test/v1/chat/completions",
        "test-model",
        Duration::from_secs(5),
    )
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "test-model".to_string(),
        messages: vec![ChatMessage::user("prompt")],
        temperature: Some(0.7),
        max_tokens: 1000,
        stream: true,
    }
}

fn policy(base_delay_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(base_delay_ms),
    }
}

#[tokio::test]
async fn transient_twice_then_success_takes_three_attempts_with_growing_delays() {
    let transport = StubTransport::new(vec![
        Step::status(429),
        Step::status(503),
        Step::completion("ok"),
    ]);

    let response = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(50))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.attempt_count(), 3);

    // Linear backoff: first gap ~1 * base, second ~2 * base.
    let gaps = transport.gaps();
    assert_eq!(gaps.len(), 2);
    assert!(gaps[0] >= Duration::from_millis(50), "first gap {:?}", gaps[0]);
    assert!(gaps[1] >= Duration::from_millis(100), "second gap {:?}", gaps[1]);
    assert!(gaps[1] > gaps[0], "delays must increase: {:?}", gaps);
}

#[tokio::test]
async fn unauthorized_fails_after_exactly_one_attempt() {
    let transport = StubTransport::new(vec![Step::status(401)]);

    let error = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        PipelineError::FatalHttp { status: 401, .. }
    ));
    assert_eq!(transport.attempt_count(), 1);
}

#[tokio::test]
async fn other_client_errors_are_not_retried() {
    let transport = StubTransport::new(vec![Step::status(400)]);

    let error = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        PipelineError::FatalHttp { status: 400, .. }
    ));
    assert_eq!(transport.attempt_count(), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_last_error() {
    let transport = StubTransport::new(vec![
        Step::status(500),
        Step::status(502),
        Step::status(429),
    ]);

    let error = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        PipelineError::TransientHttp { status: 429, .. }
    ));
    assert_eq!(transport.attempt_count(), 3);
}

#[tokio::test]
async fn transport_failures_are_retried() {
    let transport = StubTransport::new(vec![
        Step::Fail(PipelineError::Transport("connection reset".to_string())),
        Step::completion("ok"),
    ]);

    let response = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.attempt_count(), 2);
}

#[tokio::test]
async fn timeouts_are_retried_then_surfaced() {
    let transport = StubTransport::new(vec![
        Step::Fail(PipelineError::Timeout(Duration::from_secs(5))),
        Step::Fail(PipelineError::Timeout(Duration::from_secs(5))),
        Step::Fail(PipelineError::Timeout(Duration::from_secs(5))),
    ]);

    let error = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap_err();
    assert!(matches!(error, PipelineError::Timeout(_)));
    assert_eq!(transport.attempt_count(), 3);
}

#[tokio::test]
async fn error_detail_carries_upstream_body_snippet() {
    let transport = StubTransport::new(vec![Step::status(404)]);

    let error = dispatch(&transport, &endpoint(), "sk-test", &request(), &policy(10))
        .await
        .unwrap_err();
    match error {
        PipelineError::FatalHttp { status, detail } => {
            assert_eq!(status, 404);
            assert!(detail.contains("status 404"));
        }
        other => panic!("expected FatalHttp, got {:?}", other),
    }
}
