//! Policy document ingestion from files and directories.

use crate::document_index::{source_label, SqliteDocumentIndex};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use support_core::AppResult;
use walkdir::WalkDir;

/// File extensions read as plain text.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Options for [`ingest`].
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Files or directories to read
    pub paths: Vec<PathBuf>,

    /// Clear the index before ingesting
    pub reset: bool,
}

/// Outcome of an ingest run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub documents: u32,
    pub chunks: u32,
    pub bytes_processed: u64,
    pub skipped: Vec<PathBuf>,
    pub duration_secs: f64,
}

/// Read every supported file under `options.paths` into the index.
///
/// Unreadable or unsupported files are recorded in `skipped`; only index
/// failures abort the run.
pub fn ingest(index: &SqliteDocumentIndex, options: &IngestOptions) -> AppResult<IngestStats> {
    let start = Instant::now();
    let mut stats = IngestStats::default();

    tracing::info!(paths = options.paths.len(), "Starting document ingest");

    index.init()?;
    if options.reset {
        index.reset()?;
    }

    for path in &options.paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    ingest_file(index, entry.path(), &mut stats)?;
                }
            }
        } else {
            ingest_file(index, path, &mut stats)?;
        }
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingest completed: {} documents, {} chunks, {} bytes in {:.2}s",
        stats.documents,
        stats.chunks,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

fn ingest_file(
    index: &SqliteDocumentIndex,
    path: &Path,
    stats: &mut IngestStats,
) -> AppResult<()> {
    if !is_supported(path) {
        tracing::debug!("Skipping unsupported file: {:?}", path);
        stats.skipped.push(path.to_path_buf());
        return Ok(());
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
            stats.skipped.push(path.to_path_buf());
            return Ok(());
        }
    };

    let label = source_label(path);
    let chunks = index.add_document(&label, &content)?;

    stats.documents += 1;
    stats.chunks += chunks as u32;
    stats.bytes_processed += content.len() as u64;

    tracing::debug!("Ingested {:?} as '{}': {} chunks", path, label, chunks);
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
