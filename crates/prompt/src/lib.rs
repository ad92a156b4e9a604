//! Prompt system for the support desk.
//!
//! This crate turns an evidence bundle and a customer question into the
//! system/user prompt pair sent to the synthesizer:
//! - Handlebars template rendering
//! - `[Source k]` tagged evidence blocks
//! - Optional YAML override of the answer prompt per workspace

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{citation_tag, PromptBuilder};
pub use loader::{load_answer_prompt, load_prompt};
pub use types::{PromptDefinition, SynthesisRequest, ANSWER_PROMPT_ID};
