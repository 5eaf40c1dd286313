//! Generation Pipeline
//!
//! Composes the scene catalog, prompt composer, retry dispatcher, stream
//! decoder and result extractor into one asynchronous `generate` call:
//! compose → dispatch → stream → extract. Each invocation owns its decoder
//! and accumulator state, so concurrent calls never share buffers, and the
//! reasoning callback is scoped to the call that supplied it. Dropping the
//! returned future aborts the in-flight request and stops callbacks.
//!
//! Decode and extraction failures are surfaced, never retried: by then the
//! upstream call has already succeeded and a retry would only burn quota.

use crate::dispatch::{dispatch, RetryPolicy};
use crate::error::{snippet, PipelineError};
use crate::extract::{self, GenerationResult};
use crate::prompt;
use crate::provider::{
    ByteStream, ChatCompletion, ChatEndpoint, ChatMessage, ChatRequest, ChatTransport,
    HttpTransport,
};
use crate::scene;
use crate::stream::{self, StreamEvent};
use futures::StreamExt;
use std::sync::Arc;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const PROBE_MAX_TOKENS: u32 = 5;

/// One generation request: consumed by a single `generate` call and never
/// persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    word: String,
    scene_id: String,
    custom_scene: Option<String>,
}

impl GenerationRequest {
    /// Build a request. The word is trimmed on entry; the scene id is
    /// resolved against the catalog at generation time, so unknown ids are
    /// legal and fall back to the default scene.
    pub fn new(word: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self {
            word: word.into().trim().to_string(),
            scene_id: scene_id.into(),
            custom_scene: None,
        }
    }

    /// Free-text setting for the `custom` scene.
    pub fn with_custom_scene(mut self, text: impl Into<String>) -> Self {
        self.custom_scene = Some(text.into());
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }
}

/// Scene-card generation pipeline.
///
/// Stateless across calls apart from its configuration; safe to share and
/// to invoke concurrently.
pub struct GenerationPipeline {
    endpoint: ChatEndpoint,
    transport: Arc<dyn ChatTransport>,
    retry: RetryPolicy,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationPipeline {
    /// Pipeline over the real HTTP transport.
    pub fn new(endpoint: ChatEndpoint) -> Result<Self, PipelineError> {
        Ok(Self::with_transport(endpoint, Arc::new(HttpTransport::new()?)))
    }

    /// Pipeline over a caller-supplied transport (tests script one).
    pub fn with_transport(endpoint: ChatEndpoint, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            endpoint,
            transport,
            retry: RetryPolicy::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Generate a scene card without progress reporting.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        credential: &str,
    ) -> Result<GenerationResult, PipelineError> {
        self.generate_with_progress(request, credential, |_| {}).await
    }

    /// Generate a scene card, invoking `on_reasoning` once per streamed
    /// reasoning increment, in arrival order.
    pub async fn generate_with_progress<F>(
        &self,
        request: &GenerationRequest,
        credential: &str,
        mut on_reasoning: F,
    ) -> Result<GenerationResult, PipelineError>
    where
        F: FnMut(&str) + Send,
    {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(PipelineError::MissingCredential);
        }

        // Composing: pure, cannot fail.
        let setting = scene::resolve(&request.scene_id, request.custom_scene.as_deref());
        let prompt = prompt::compose(&request.word, &setting);
        tracing::debug!(
            word = %request.word,
            scene = %request.scene_id,
            phase = "composing",
            "composed generation prompt"
        );

        // Dispatching: may loop through retry attempts internally.
        let chat_request = ChatRequest {
            model: self.endpoint.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
            stream: true,
        };
        tracing::debug!(model = %self.endpoint.model, phase = "dispatching", "sending chat request");
        let response = dispatch(
            self.transport.as_ref(),
            &self.endpoint,
            credential,
            &chat_request,
            &self.retry,
        )
        .await?;

        // Streaming: some services ignore the streaming flag and answer
        // with a plain completion envelope, so branch on the body framing.
        let content = if response.is_event_stream() {
            tracing::debug!(phase = "streaming", "decoding event stream");
            let text = stream::decode(response.body, |event| {
                if let StreamEvent::Reasoning(delta) = &event {
                    on_reasoning(delta);
                }
            })
            .await?;
            text.content
        } else {
            tracing::debug!(phase = "streaming", "reading non-streamed completion");
            let body = collect_body(response.body).await?;
            completion_content(&body)?
        };

        // Extracting.
        tracing::debug!(phase = "extracting", "parsing assembled content");
        let result = extract::extract(&content)?;
        if !result.english_word.trim().eq_ignore_ascii_case(&request.word) {
            // Models occasionally normalize casing or spelling; that is
            // worth a warning, not a failure.
            tracing::warn!(
                requested = %request.word,
                returned = %result.english_word,
                "generated card does not echo the requested word"
            );
        }
        tracing::info!(word = %result.english_word, "generated scene card");
        Ok(result)
    }

    /// Cheap connectivity check: one non-streamed completion capped at a
    /// handful of tokens. Succeeds iff the endpoint accepts the credential.
    pub async fn probe(&self, credential: &str) -> Result<(), PipelineError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(PipelineError::MissingCredential);
        }

        let chat_request = ChatRequest {
            model: self.endpoint.model.clone(),
            messages: vec![ChatMessage::user("Hello")],
            temperature: None,
            max_tokens: PROBE_MAX_TOKENS,
            stream: false,
        };
        let response = dispatch(
            self.transport.as_ref(),
            &self.endpoint,
            credential,
            &chat_request,
            &self.retry,
        )
        .await?;
        // Drain so the connection can be reused; the payload is irrelevant.
        collect_body(response.body).await?;
        tracing::info!(model = %self.endpoint.model, "endpoint probe succeeded");
        Ok(())
    }
}

async fn collect_body(mut body: ByteStream) -> Result<Vec<u8>, PipelineError> {
    let mut collected = Vec::new();
    while let Some(chunk) = body.next().await {
        collected.extend_from_slice(&chunk?);
    }
    Ok(collected)
}

/// Pull the assistant content out of a non-streamed completion envelope.
fn completion_content(body: &[u8]) -> Result<String, PipelineError> {
    let completion: ChatCompletion = serde_json::from_slice(body).map_err(|_| {
        PipelineError::MalformedPayload(format!(
            "invalid completion envelope: {}",
            snippet(&String::from_utf8_lossy(body))
        ))
    })?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::MalformedPayload("no choices in response".to_string()))?;
    choice
        .message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| PipelineError::MalformedPayload("choice carried no content".to_string()))
}
