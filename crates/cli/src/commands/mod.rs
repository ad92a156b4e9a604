//! Command handlers for the Support Desk CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod chat;
pub mod customers;
pub mod docs;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use customers::CustomersCommand;
pub use docs::DocsCommand;

use support_core::{AnswerResult, AppResult};
use tokio_util::sync::CancellationToken;

/// Print an answer and its numbered sources, or the whole result as JSON.
pub(crate) fn print_answer(result: &AnswerResult, json: bool) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}", result.answer);

    if result.has_context {
        println!();
        println!("Sources:");
        for source in &result.sources {
            println!(
                "  [{}] {} ({}%)",
                source.id, source.label, source.relevance_percent
            );
        }
    }

    Ok(())
}

/// A token that fires on Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight request");
            child.cancel();
        }
    });
    token
}
