//! Scenecard: Mnemonic Scene-Card Generation
//!
//! Turns a vocabulary word plus a thematic scene into a validated,
//! structured mnemonic card by driving a hosted chat-completion model,
//! tolerating streamed, fenced, free-text output on the way. The pipeline
//! composes a scene-specific prompt, dispatches it with timeout and retry,
//! decodes the event stream into reasoning and content channels, and
//! extracts the final JSON card.

pub mod dispatch;
pub mod error;
pub mod extract;
pub mod image;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod publish;
pub mod scene;
pub mod stream;

pub use error::PipelineError;
pub use extract::GenerationResult;
pub use pipeline::{GenerationPipeline, GenerationRequest};
pub use provider::ChatEndpoint;
pub use scene::SceneSetting;
pub use stream::{StreamEvent, StreamText};
