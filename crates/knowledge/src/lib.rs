//! Knowledge sources for the support desk.
//!
//! Two read-only stores feed the answer pipeline:
//! - [`CustomerDirectory`]: structured customer records, orders and tickets
//! - [`DocumentIndex`]: similarity search over policy documents
//!
//! Both ship with SQLite adapters; ingestion and seeding are write paths
//! used by the CLI only.

pub mod directory;
pub mod document_index;
pub mod embeddings;
pub mod ingest;

pub use directory::{CustomerDirectory, SeedStats, SqliteDirectory};
pub use document_index::{chunk_text, source_label, DocumentIndex, IndexStats, SqliteDocumentIndex};
pub use embeddings::TrigramEmbedder;
pub use ingest::{ingest, IngestOptions, IngestStats};
