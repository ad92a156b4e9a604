//! LLM integration crate for the support desk.
//!
//! This crate provides a provider-agnostic abstraction for the answer
//! synthesis step. Providers sit behind the `LlmClient` trait.
//!
//! # Providers
//! - **Gemini**: Google's hosted models (default, needs an API key)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use support_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{client_from_config, create_client};
pub use providers::{GeminiClient, OllamaClient};
pub use types::ProviderType;
