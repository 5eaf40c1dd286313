//! Note Publication Seam
//!
//! Finished scene cards are handed to an external note-taking collaborator.
//! The note layout lives here; delivery (a single fire-and-forget webhook
//! POST) is the collaborator's concern behind the [`Publisher`] trait.

use crate::error::PipelineError;
use crate::extract::GenerationResult;
use async_trait::async_trait;

/// Tag appended to every note unless the caller supplies one.
pub const DEFAULT_TAG: &str = "#英语单词";

/// Render a scene card as a note body.
pub fn format_note(result: &GenerationResult, default_tag: Option<&str>) -> String {
    let tag = default_tag
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .unwrap_or(DEFAULT_TAG);
    format!(
        "📝 {}\n\n---\n💡 助记拆解：\n{}\n\n🌟 场景描述：\n{}\n\n\n{} #场景记忆",
        result.english_word, result.keyword_breakdown, result.image_description, tag
    )
}

/// Destination for finished notes
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver one formatted note. Implementations report success or
    /// failure; the pipeline never retries publication.
    async fn publish(&self, note: &str) -> Result<(), PipelineError>;
}
