//! Chat Endpoint Integration
//!
//! OpenAI-compatible chat-completions transport used by the generation
//! pipeline. Provides endpoint presets for the hosted services the tool
//! targets, the request/response wire types, and a transport seam so tests
//! can script responses without a network.

use crate::error::PipelineError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Chat endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEndpoint {
    /// Full chat-completions URL.
    pub url: String,
    /// Model (or service-specific endpoint id) named in the request body.
    pub model: String,
    /// Overall deadline covering headers and the streamed body.
    pub timeout: Duration,
}

impl ChatEndpoint {
    /// SiliconFlow-hosted DeepSeek chat endpoint.
    pub fn siliconflow() -> Self {
        Self {
            url: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            model: "deepseek-ai/DeepSeek-V3".to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Zhipu GLM chat endpoint.
    pub fn glm() -> Self {
        Self {
            url: "https://open.bigmodel.cn/api/paas/v4/chat/completions".to_string(),
            model: "glm-4-flash".to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Volcengine Ark chat endpoint. Models are account-scoped endpoint ids,
    /// so the caller supplies one. Reasoning models there can run long,
    /// hence the wider deadline.
    pub fn volcengine(endpoint_id: impl Into<String>) -> Self {
        Self {
            url: "https://ark.cn-beijing.volces.com/api/v3/chat/completions".to_string(),
            model: endpoint_id.into(),
            timeout: Duration::from_secs(180),
        }
    }

    /// Arbitrary OpenAI-compatible endpoint.
    pub fn custom(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            timeout,
        }
    }
}

/// Chat message in the request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Non-streamed chat-completions response envelope
#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: AssistantMessage,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

/// Raw response body as delivered by the transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, PipelineError>> + Send>>;

/// Response handed back by a transport: the status line plus the unread body.
pub struct TransportResponse {
    pub status: u16,
    pub content_type: String,
    pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("body", &"<ByteStream>")
            .finish()
    }
}

impl TransportResponse {
    /// Whether the body is framed as server-sent event lines.
    pub fn is_event_stream(&self) -> bool {
        self.content_type
            .to_ascii_lowercase()
            .starts_with("text/event-stream")
    }
}

/// Transport seam between the dispatcher and the network
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Perform one request attempt. Classification of the HTTP status is
    /// the dispatcher's job; the transport only raises `Timeout` and
    /// `Transport` for failures below the HTTP layer.
    async fn send(
        &self,
        endpoint: &ChatEndpoint,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, PipelineError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, PipelineError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &ChatEndpoint,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportResponse, PipelineError> {
        let deadline = endpoint.timeout;
        let response = self
            .client
            .post(&endpoint.url)
            .timeout(deadline)
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, deadline))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        // The per-request deadline keeps running while the body streams, so
        // mid-stream expiry surfaces as `Timeout` from the chunk reads.
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_transport_error(e, deadline)));

        Ok(TransportResponse {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}

/// Classify a non-2xx HTTP status.
///
/// 401/403 mean the credential is invalid and retrying cannot help; 429 and
/// 5xx are worth another attempt; every other 4xx is a malformed or
/// unsupported request.
pub fn classify_status(status: u16, detail: String) -> PipelineError {
    match status {
        401 | 403 => PipelineError::FatalHttp { status, detail },
        429 => PipelineError::TransientHttp { status, detail },
        500..=599 => PipelineError::TransientHttp { status, detail },
        _ => PipelineError::FatalHttp { status, detail },
    }
}

fn map_transport_error(error: reqwest::Error, deadline: Duration) -> PipelineError {
    if error.is_timeout() {
        PipelineError::Timeout(deadline)
    } else {
        PipelineError::Transport(error.to_string())
    }
}
