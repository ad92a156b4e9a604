//! Docs command handler.
//!
//! Manages the policy document index.

use clap::{Args, Subcommand};
use std::path::PathBuf;
use support_core::{config::AppConfig, AppError, AppResult};
use support_knowledge::{ingest, IngestOptions, SqliteDocumentIndex};

/// Manage the policy document index
#[derive(Args, Debug)]
pub struct DocsCommand {
    #[command(subcommand)]
    pub action: DocsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// Ingest .txt and .md files or directories
    Add(DocsAddCommand),
    /// Show index statistics
    Stats(DocsStatsCommand),
    /// Remove every document from the index
    Reset,
}

impl DocsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let index = SqliteDocumentIndex::new(
            config.index_path(),
            config.storage.chunk_size,
            config.storage.chunk_overlap,
        );

        match &self.action {
            DocsAction::Add(cmd) => cmd.execute(index).await,
            DocsAction::Stats(cmd) => cmd.execute(index).await,
            DocsAction::Reset => {
                tracing::info!("Resetting document index");
                blocking(move || {
                    index.init()?;
                    index.reset()
                })
                .await?;
                println!("Document index cleared");
                Ok(())
            }
        }
    }
}

/// Ingest documents
#[derive(Args, Debug)]
pub struct DocsAddCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocsAddCommand {
    async fn execute(&self, index: SqliteDocumentIndex) -> AppResult<()> {
        tracing::info!("Executing docs add command for {} path(s)", self.paths.len());

        let options = IngestOptions {
            paths: self.paths.clone(),
            reset: self.reset,
        };
        let stats = blocking(move || ingest(&index, &options)).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks, {} bytes) in {:.2}s",
                stats.documents, stats.chunks, stats.bytes_processed, stats.duration_secs
            );
            for path in &stats.skipped {
                println!("  skipped {}", path.display());
            }
        }

        Ok(())
    }
}

/// Show index statistics
#[derive(Args, Debug)]
pub struct DocsStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocsStatsCommand {
    async fn execute(&self, index: SqliteDocumentIndex) -> AppResult<()> {
        let path = index.path().to_path_buf();
        let stats = blocking(move || {
            index.init()?;
            index.stats()
        })
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Index: {}", path.display());
            println!("Documents: {}", stats.documents);
            println!("Chunks: {}", stats.chunks);
        }

        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Other(format!("Index task failed: {}", e)))?
}
