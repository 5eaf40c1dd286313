//! Request Dispatch with Bounded Retry
//!
//! Owns the request lifecycle: one transport attempt per pass, linear
//! backoff between transient failures, and classification of HTTP outcomes.
//! Fatal errors surface on first occurrence; exhausting the attempt budget
//! surfaces the last classified error.

use crate::error::{snippet, PipelineError};
use crate::provider::{classify_status, ByteStream, ChatEndpoint, ChatRequest, ChatTransport, TransportResponse};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep;

/// Bytes of a non-2xx body drained for the diagnostic detail.
const MAX_ERROR_BODY_BYTES: usize = 2048;

/// Retry policy applied by [`dispatch`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: usize,
    /// Backoff unit; the delay before attempt n+1 is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Send a chat request, retrying transient failures.
///
/// Returns the raw response with its body unread so the caller can decode
/// it incrementally. The delay before each retry is fully elapsed before
/// the next attempt starts; there is no jitter.
pub async fn dispatch(
    transport: &dyn ChatTransport,
    endpoint: &ChatEndpoint,
    credential: &str,
    request: &ChatRequest,
    policy: &RetryPolicy,
) -> Result<TransportResponse, PipelineError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: usize = 0;

    loop {
        attempt += 1;
        let error = match transport.send(endpoint, credential, request).await {
            Ok(response) if (200..300).contains(&response.status) => {
                tracing::debug!(attempt, status = response.status, "upstream accepted request");
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status;
                let detail = read_error_detail(response.body).await;
                classify_status(status, detail)
            }
            Err(error) => error,
        };

        if attempt >= max_attempts || !error.is_transient() {
            tracing::warn!(attempt, "dispatch failed: {}", error);
            return Err(error);
        }

        let delay = policy.base_delay * attempt as u32;
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying after transient failure: {}",
            error
        );
        sleep(delay).await;
    }
}

/// Drain a bounded prefix of an error body for diagnostics.
async fn read_error_detail(mut body: ByteStream) -> String {
    let mut collected: Vec<u8> = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                collected.extend_from_slice(&bytes);
                if collected.len() >= MAX_ERROR_BODY_BYTES {
                    break;
                }
            }
            // The status line already classified the outcome; a broken
            // error body only costs us detail.
            Err(_) => break,
        }
    }
    snippet(&String::from_utf8_lossy(&collected))
}
