//! Query pipeline for the support desk.
//!
//! A query flows through:
//! 1. [`match_names`] and [`KeywordClassifier`]: routing signals
//! 2. [`Router`]: decision table, with a trial customer lookup when no signal fires
//! 3. [`ContextAggregator`]: evidence from the chosen source(s), failures isolated per source
//! 4. `PromptBuilder` (from `support-prompt`): tagged evidence blocks
//! 5. [`SynthesisGateway`]: deadline, bounded retry, cancellation
//! 6. [`postprocess`]: citation stripping and source attribution
//!
//! [`SupportPipeline::answer`] is the entry point.

pub mod aggregator;
pub mod classifier;
pub mod matcher;
pub mod pipeline;
pub mod postprocess;
pub mod router;
pub mod synthesizer;

#[cfg(test)]
mod tests;

pub use aggregator::ContextAggregator;
pub use classifier::KeywordClassifier;
pub use matcher::match_names;
pub use pipeline::SupportPipeline;
pub use postprocess::{strip_citations, NO_CONTEXT_ANSWER};
pub use router::{decide, Router, Routing};
pub use synthesizer::{AnswerSynthesizer, LlmSynthesizer, RetryPolicy, SynthesisGateway};
