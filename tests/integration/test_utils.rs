//! Shared test utilities for integration tests
//!
//! Provides a scripted transport so pipeline and dispatcher tests can
//! exercise the full request lifecycle without a network.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use scenecard::error::PipelineError;
use scenecard::provider::{ChatEndpoint, ChatRequest, ChatTransport, TransportResponse};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One scripted transport outcome.
pub enum Step {
    /// Respond with the given status, content type, and body chunks.
    Respond {
        status: u16,
        content_type: &'static str,
        chunks: Vec<Vec<u8>>,
    },
    /// Fail below the HTTP layer.
    Fail(PipelineError),
}

impl Step {
    /// 200 response carrying a non-streamed completion envelope whose
    /// assistant content is `content`.
    pub fn completion(content: &str) -> Self {
        let envelope = serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        });
        Step::Respond {
            status: 200,
            content_type: "application/json",
            chunks: vec![envelope.to_string().into_bytes()],
        }
    }

    /// 200 event-stream response with one chunk per entry in `chunks`.
    pub fn event_stream(chunks: Vec<Vec<u8>>) -> Self {
        Step::Respond {
            status: 200,
            content_type: "text/event-stream",
            chunks,
        }
    }

    /// Error status with a small JSON body.
    pub fn status(status: u16) -> Self {
        Step::Respond {
            status,
            content_type: "application/json",
            chunks: vec![format!(r#"{{"error":{{"message":"status {}"}}}}"#, status).into_bytes()],
        }
    }
}

/// Transport that pops one scripted [`Step`] per send, recording the
/// request and the attempt time.
pub struct StubTransport {
    steps: Mutex<VecDeque<Step>>,
    pub attempts: Mutex<Vec<Instant>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl StubTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            attempts: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Delays between consecutive attempts.
    pub fn gaps(&self) -> Vec<Duration> {
        let attempts = self.attempts.lock().unwrap();
        attempts.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}

#[async_trait]
impl ChatTransport for StubTransport {
    async fn send(
        &self,
        _endpoint: &ChatEndpoint,
        _credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, PipelineError> {
        self.attempts.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Respond {
                status,
                content_type,
                chunks,
            }) => Ok(TransportResponse {
                status,
                content_type: content_type.to_string(),
                body: Box::pin(stream::iter(
                    chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))),
                )),
            }),
            Some(Step::Fail(error)) => Err(error),
            None => panic!("transport invoked more times than scripted"),
        }
    }
}

/// Format one `data:` event line carrying a content delta.
pub fn content_line(delta: &str) -> Vec<u8> {
    sse_line(&serde_json::json!({
        "choices": [{ "delta": { "content": delta } }]
    }))
}

/// Format one `data:` event line carrying a reasoning delta.
pub fn reasoning_line(delta: &str) -> Vec<u8> {
    sse_line(&serde_json::json!({
        "choices": [{ "delta": { "reasoning_content": delta } }]
    }))
}

pub fn done_line() -> Vec<u8> {
    b"data: [DONE]\n\n".to_vec()
}

fn sse_line(frame: &serde_json::Value) -> Vec<u8> {
    format!("data: {}\n\n", frame).into_bytes()
}

/// Sample card payload used across the pipeline scenarios.
pub fn sample_card_json() -> String {
    serde_json::json!({
        "英语": "justice",
        "关键词": "just+ice",
        "世界观": "现代日常生活",
        "图像描述": "一个小孩只得到了一个冰激凌，但也算**公平**地解决了"
    })
    .to_string()
}
