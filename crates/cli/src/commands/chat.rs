//! Chat command handler.
//!
//! Reads questions from stdin, one per line, and answers each with the same
//! pipeline. A failed question is reported and the session continues.

use super::print_answer;
use clap::Args;
use support_core::{config::AppConfig, AppError, AppResult};
use support_rag::SupportPipeline;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of policy passages to retrieve (default from config)
    #[arg(short = 'n', long)]
    pub results: Option<usize>,

    /// Output each answer as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        if self.results == Some(0) {
            return Err(AppError::Config("--results must be at least 1".to_string()));
        }

        let pipeline = SupportPipeline::from_config(config)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let shutdown = CancellationToken::new();

        loop {
            if !self.json {
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
            }

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    shutdown.cancel();
                    None
                }
            };

            let Some(line) = line else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if matches!(question, "exit" | "quit") {
                break;
            }

            let cancel = shutdown.child_token();
            let answer = tokio::select! {
                answer = pipeline.answer_cancellable(question, self.results, &cancel) => answer,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    tracing::warn!("Question interrupted");
                    continue;
                }
            };

            match answer {
                Ok(result) => print_answer(&result, self.json)?,
                Err(e) => {
                    tracing::error!("Question failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }

            if !self.json {
                println!();
            }
        }

        Ok(())
    }
}
