//! Ask command handler.
//!
//! Runs one question through the support pipeline.

use super::{cancel_on_ctrl_c, print_answer};
use clap::Args;
use support_core::{config::AppConfig, AppError, AppResult};
use support_rag::SupportPipeline;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of policy passages to retrieve (default from config)
    #[arg(short = 'n', long)]
    pub results: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        if self.results == Some(0) {
            return Err(AppError::Config("--results must be at least 1".to_string()));
        }

        let pipeline = SupportPipeline::from_config(config)?;
        let cancel = cancel_on_ctrl_c();

        let result = pipeline
            .answer_cancellable(&self.question, self.results, &cancel)
            .await?;

        tracing::debug!(
            route = %result.route,
            sources = result.sources.len(),
            "Answer ready"
        );

        print_answer(&result, self.json)
    }
}
