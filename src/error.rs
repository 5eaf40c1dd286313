//! Error types for the scene-card generation pipeline.
//!
//! Every layer classifies the failures it observes and re-raises them
//! unchanged; the pipeline is the only layer that decides between retrying
//! and surfacing. User-visible text comes from [`PipelineError::user_message`],
//! never from a raw upstream payload.

use std::time::Duration;
use thiserror::Error;

/// Character budget for upstream text carried inside an error.
const SNIPPET_MAX_CHARS: usize = 200;

/// Generation pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned retryable status {status}: {detail}")]
    TransientHttp { status: u16, detail: String },

    #[error("upstream rejected the request with status {status}: {detail}")]
    FatalHttp { status: u16, detail: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("upstream response carried no usable payload: {0}")]
    MalformedPayload(String),

    #[error("could not extract a scene card from model output: {snippet}")]
    ExtractionFailed { snippet: String },
}

impl PipelineError {
    /// Whether the dispatcher may retry after this error.
    ///
    /// Payload errors are never transient: the upstream call already
    /// succeeded and retrying would waste quota.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Timeout(_)
                | PipelineError::TransientHttp { .. }
                | PipelineError::Transport(_)
        )
    }

    /// Short human-readable message for surfacing in a UI.
    ///
    /// Derived from the error tag alone so no upstream payload or stack
    /// detail ever reaches the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::MissingCredential => "请先设置 API Key",
            PipelineError::Timeout(_) => "请求超时，请稍后重试",
            PipelineError::TransientHttp { .. } | PipelineError::Transport(_) => {
                "生成描述失败，请稍后重试"
            }
            PipelineError::FatalHttp {
                status: 401 | 403, ..
            } => "API Key 无效，请检查配置",
            PipelineError::FatalHttp { .. } => "生成描述失败，请检查 API 配置",
            PipelineError::MalformedPayload(_) | PipelineError::ExtractionFailed { .. } => {
                "生成的内容格式不正确"
            }
        }
    }
}

/// Configuration errors raised outside the per-call pipeline taxonomy
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid log directive: {0}")]
    InvalidLogDirective(String),

    #[error("invalid log format: {0} (must be 'json' or 'text')")]
    InvalidLogFormat(String),
}

/// Truncate diagnostic text to a bounded, char-boundary-safe snippet.
pub fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    out.push_str(" ...");
    out
}
