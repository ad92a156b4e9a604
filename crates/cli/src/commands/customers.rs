//! Customers command handler.
//!
//! Seeds and inspects the customer directory.

use clap::{Args, Subcommand};
use support_core::{config::AppConfig, AppError, AppResult};
use support_knowledge::{CustomerDirectory, SqliteDirectory};

/// Manage the customer directory
#[derive(Args, Debug)]
pub struct CustomersCommand {
    #[command(subcommand)]
    pub action: CustomersAction,
}

#[derive(Subcommand, Debug)]
pub enum CustomersAction {
    /// Create the schema and load the sample customers
    Seed,
    /// Find customers by name or email
    Search(CustomersSearchCommand),
}

impl CustomersCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let directory = SqliteDirectory::new(config.directory_path());

        match &self.action {
            CustomersAction::Seed => {
                tracing::info!("Seeding customer directory at {:?}", directory.path());
                let stats = tokio::task::spawn_blocking(move || directory.seed_sample_data())
                    .await
                    .map_err(|e| AppError::Other(format!("Seed task failed: {}", e)))??;
                println!(
                    "Seeded {} customers, {} tickets, {} orders",
                    stats.customers, stats.tickets, stats.orders
                );
                Ok(())
            }
            CustomersAction::Search(cmd) => cmd.execute(&directory).await,
        }
    }
}

/// Find customers
#[derive(Args, Debug)]
pub struct CustomersSearchCommand {
    /// Name or email fragment
    pub term: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CustomersSearchCommand {
    async fn execute(&self, directory: &SqliteDirectory) -> AppResult<()> {
        let records = directory.search(&self.term).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&records)?);
        } else if records.is_empty() {
            println!("No customers match '{}'", self.term);
        } else {
            for record in &records {
                println!(
                    "{:>4}  {:<20} {:<28} {}",
                    record.id,
                    record.name,
                    record.email,
                    record.account_type.as_deref().unwrap_or("-")
                );
            }
        }

        Ok(())
    }
}
