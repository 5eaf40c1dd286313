//! Result Extraction
//!
//! The model is instructed to answer with a single JSON object, but real
//! responses arrive fenced in markdown, prefixed with prose, or otherwise
//! decorated. Extraction therefore tries the verbatim text first, then a
//! fence-stripped view, then the first balanced `{...}` span.

use crate::error::{snippet, PipelineError};
use serde::{Deserialize, Serialize};

/// Validated scene card produced by a successful generation.
///
/// All four fields are guaranteed present after extraction (possibly as
/// empty strings); callers never need to null-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(rename = "英语")]
    pub english_word: String,
    #[serde(rename = "关键词")]
    pub keyword_breakdown: String,
    #[serde(rename = "世界观")]
    pub worldview: String,
    #[serde(rename = "图像描述")]
    pub image_description: String,
}

/// Parse assembled model output into a [`GenerationResult`].
pub fn extract(content: &str) -> Result<GenerationResult, PipelineError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(PipelineError::MalformedPayload(
            "model returned no content".to_string(),
        ));
    }

    if let Ok(result) = serde_json::from_str::<GenerationResult>(text) {
        return Ok(result);
    }
    if let Some(stripped) = strip_code_fence(text) {
        if let Ok(result) = serde_json::from_str::<GenerationResult>(stripped.trim()) {
            return Ok(result);
        }
    }
    if let Some(span) = balanced_object_span(text) {
        if let Ok(result) = serde_json::from_str::<GenerationResult>(span) {
            return Ok(result);
        }
    }

    Err(PipelineError::ExtractionFailed {
        snippet: snippet(text),
    })
}

/// Strip one layer of markdown code fencing, language tag included.
fn strip_code_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    // Drop the opening fence line ("```json" or bare "```").
    let body = &rest[rest.find('\n')? + 1..];
    body.trim_end().strip_suffix("```")
}

/// First balanced top-level `{...}` span, string- and escape-aware.
fn balanced_object_span(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (idx, &byte) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            b'}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        return start.map(|s| &text[s..=idx]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}
