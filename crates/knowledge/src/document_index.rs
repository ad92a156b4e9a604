//! Policy document index: chunked documents ranked by embedding similarity.

use crate::embeddings::{bytes_to_embedding, cosine_similarity, embedding_to_bytes, TrigramEmbedder};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use std::path::{Path, PathBuf};
use support_core::{AppError, AppResult, PolicyChunk};
use text_splitter::{ChunkConfig, TextSplitter};

/// Similarity search over policy text.
///
/// Failures surface as [`AppError::IndexUnavailable`].
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Up to `n_results` chunks, most similar first, similarity in `[0, 1]`.
    async fn search(&self, query: &str, n_results: usize) -> AppResult<Vec<PolicyChunk>>;
}

/// Document and chunk counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: u32,
    pub chunks: u32,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    label TEXT PRIMARY KEY,
    indexed_at TEXT NOT NULL,
    size_bytes INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    label TEXT NOT NULL,
    position INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (label, position),
    FOREIGN KEY (label) REFERENCES documents(label)
);
"#;

/// SQLite-backed document index with trigram embeddings.
#[derive(Debug, Clone)]
pub struct SqliteDocumentIndex {
    db_path: PathBuf,
    embedder: TrigramEmbedder,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SqliteDocumentIndex {
    pub fn new(db_path: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            db_path: db_path.into(),
            embedder: TrigramEmbedder::default(),
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Create the database file and tables if missing.
    pub fn init(&self) -> AppResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::IndexUnavailable(format!(
                    "Failed to create directory for {:?}: {}",
                    self.db_path, e
                ))
            })?;
        }

        let conn = Connection::open(&self.db_path).map_err(index_error)?;
        conn.execute_batch(SCHEMA).map_err(index_error)?;

        tracing::debug!("Initialized document index at {:?}", self.db_path);
        Ok(conn)
    }

    /// Chunk, embed and store a document. Re-adding a label replaces it.
    ///
    /// Returns the number of chunks written.
    pub fn add_document(&self, label: &str, content: &str) -> AppResult<usize> {
        let chunks = chunk_text(content, self.chunk_size, self.chunk_overlap)?;
        let mut conn = self.init()?;
        let tx = conn.transaction().map_err(index_error)?;

        tx.execute("DELETE FROM chunks WHERE label = ?1", params![label])
            .map_err(index_error)?;
        tx.execute(
            "INSERT OR REPLACE INTO documents (label, indexed_at, size_bytes) VALUES (?1, ?2, ?3)",
            params![label, Utc::now().to_rfc3339(), content.len() as i64],
        )
        .map_err(index_error)?;

        for (position, chunk) in chunks.iter().enumerate() {
            let embedding = embedding_to_bytes(&self.embedder.embed(chunk));
            tx.execute(
                "INSERT INTO chunks (label, position, content, embedding) VALUES (?1, ?2, ?3, ?4)",
                params![label, position as i64, chunk, embedding],
            )
            .map_err(index_error)?;
        }

        tx.commit().map_err(index_error)?;

        tracing::debug!(label, chunks = chunks.len(), "Indexed document");
        Ok(chunks.len())
    }

    pub fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.init()?;
        let count = |sql: &str| -> AppResult<u32> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|v| v as u32)
                .map_err(index_error)
        };

        Ok(IndexStats {
            documents: count("SELECT COUNT(*) FROM documents")?,
            chunks: count("SELECT COUNT(*) FROM chunks")?,
        })
    }

    /// Delete every document.
    pub fn reset(&self) -> AppResult<()> {
        let conn = self.init()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM documents;")
            .map_err(index_error)?;

        tracing::info!("Reset document index at {:?}", self.db_path);
        Ok(())
    }
}

#[async_trait]
impl DocumentIndex for SqliteDocumentIndex {
    async fn search(&self, query: &str, n_results: usize) -> AppResult<Vec<PolicyChunk>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let path = self.db_path.clone();
        let query_embedding = self.embedder.embed(query);

        let results = tokio::task::spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| AppError::IndexUnavailable(format!("Failed to open {:?}: {}", path, e)))?;
            rank_chunks(&conn, &query_embedding, n_results)
        })
        .await
        .map_err(|e| AppError::IndexUnavailable(format!("Index task failed: {}", e)))??;

        if let Some(top) = results.first() {
            tracing::debug!(
                returned = results.len(),
                top_label = %top.source_label,
                top_score = top.similarity,
                "Document index search"
            );
        } else {
            tracing::debug!("Document index search returned no chunks");
        }

        Ok(results)
    }
}

/// Score every stored chunk against the query and keep the best `top_k`.
///
/// Chunks sharing no features with the query (similarity 0) are dropped.
fn rank_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<PolicyChunk>> {
    let mut stmt = conn
        .prepare("SELECT label, content, embedding FROM chunks ORDER BY label, position")
        .map_err(index_error)?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })
        .map_err(index_error)?;

    let mut results = Vec::new();
    for row in rows {
        let (label, content, bytes) = row.map_err(index_error)?;
        let Some(embedding) = bytes_to_embedding(&bytes) else {
            tracing::warn!(label = %label, "Skipping chunk with malformed embedding");
            continue;
        };

        let similarity = cosine_similarity(query_embedding, &embedding).clamp(0.0, 1.0);
        if similarity > 0.0 {
            results.push(PolicyChunk {
                content,
                source_label: label,
                similarity,
            });
        }
    }

    // Stable sort keeps document order among equal scores
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(top_k);

    Ok(results)
}

/// Split text into overlapping chunks of at most `size` characters.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> AppResult<Vec<String>> {
    let config = ChunkConfig::new(size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunking parameters: {}", e)))?;
    let splitter = TextSplitter::new(config);

    Ok(splitter.chunks(text).map(str::to_string).collect())
}

/// Source label for a document path: the file name without a
/// `.txt`, `.md` or `.pdf` extension.
pub fn source_label(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    for ext in [".txt", ".md", ".pdf"] {
        if let Some(stem) = file_name.strip_suffix(ext) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    }

    file_name
}

fn index_error(err: rusqlite::Error) -> AppError {
    AppError::IndexUnavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const REFUNDS: &str = "Refund policy: purchases may be refunded within 30 days. \
        Refunds are issued to the original payment method.";
    const SHIPPING: &str = "Shipping policy: standard delivery takes 3-5 business days \
        and costs $5.99. Express delivery arrives next day.";

    fn index_with_docs() -> (TempDir, SqliteDocumentIndex) {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteDocumentIndex::new(temp_dir.path().join("policies.sqlite"), 1000, 200);
        index.add_document("refund_policy", REFUNDS).unwrap();
        index.add_document("shipping_policy", SHIPPING).unwrap();
        (temp_dir, index)
    }

    #[tokio::test]
    async fn test_search_ranks_relevant_document_first() {
        let (_tmp, index) = index_with_docs();

        let results = index.search("How do refunds work?", 5).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].source_label, "refund_policy");
        assert!(results
            .windows(2)
            .all(|w| w[0].similarity >= w[1].similarity));
        assert!(results
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.similarity)));
    }

    #[tokio::test]
    async fn test_search_respects_n_results() {
        let (_tmp, index) = index_with_docs();
        let results = index.search("policy delivery refund", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(index.search("policy", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteDocumentIndex::new(temp_dir.path().join("policies.sqlite"), 1000, 200);
        index.init().unwrap();

        assert!(index.search("refund", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_index_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let index = SqliteDocumentIndex::new(temp_dir.path().join("absent.sqlite"), 1000, 200);

        let result = index.search("refund", 5).await;
        assert!(matches!(result, Err(AppError::IndexUnavailable(_))));
    }

    #[test]
    fn test_readding_document_replaces_chunks() {
        let (_tmp, index) = index_with_docs();
        index.add_document("refund_policy", "Refunds take 10 days.").unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 2);

        index.reset().unwrap();
        assert_eq!(index.stats().unwrap(), IndexStats::default());
    }

    #[test]
    fn test_chunk_text_respects_size() {
        let text = "Returns are accepted within thirty days. ".repeat(20);
        let chunks = chunk_text(&text, 100, 20).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_chunk_text_rejects_overlap_not_below_size() {
        assert!(matches!(
            chunk_text("anything", 100, 100),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_source_label() {
        assert_eq!(source_label(Path::new("docs/refund_policy.txt")), "refund_policy");
        assert_eq!(source_label(Path::new("faq.md")), "faq");
        assert_eq!(source_label(Path::new("terms.pdf")), "terms");
        assert_eq!(source_label(Path::new("notes.rtf")), "notes.rtf");
    }
}
