//! Shared types used by chunk store implementations.

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::processing::chunking::TextChunk;

/// Errors returned by a chunk store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Full-text index rejected an operation.
    #[error("Index operation failed: {0}")]
    Index(#[from] tantivy::TantivyError),
    /// The file already owns a committed chunk set.
    #[error("Chunks already stored for file {0}")]
    AlreadyStored(String),
    /// Backend could not complete the request.
    #[error("Chunk store unavailable: {0}")]
    Unavailable(String),
}

/// Chunks of one file, ready to be written as a single batch.
#[derive(Debug, Clone)]
pub struct ChunkBatch {
    /// Owning file identifier.
    pub file_id: String,
    /// File name copied onto every chunk.
    pub file_name: String,
    /// Uploader identity copied onto every chunk.
    pub uploaded_by: String,
    /// Target chunk size used by the splitter.
    pub chunk_size: usize,
    /// Target overlap used by the splitter.
    pub overlap: usize,
    /// Split output in index order.
    pub chunks: Vec<TextChunk>,
}

/// Committed chunk as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    /// Identifier assigned by the store.
    pub chunk_id: String,
    /// Owning file identifier.
    pub file_id: String,
    /// Exact slice of the extracted text.
    pub content: String,
    /// Reserved vector slot; never populated or used for ranking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Zero-based position within the file.
    pub chunk_index: usize,
    /// Character offset of the first character (inclusive).
    pub start_char: usize,
    /// Character offset one past the last character (exclusive).
    pub end_char: usize,
    /// Name of the owning file.
    pub file_name: String,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Target chunk size recorded at ingestion.
    pub chunk_size: usize,
    /// Target overlap recorded at ingestion.
    pub overlap: usize,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl ChunkBatch {
    /// Turn the batch into records, assigning identifiers and a shared creation timestamp.
    pub fn into_records(self) -> Vec<ChunkRecord> {
        let created_at = current_timestamp_rfc3339();
        let ChunkBatch {
            file_id,
            file_name,
            uploaded_by,
            chunk_size,
            overlap,
            chunks,
        } = self;

        chunks
            .into_iter()
            .map(|chunk| ChunkRecord {
                chunk_id: uuid::Uuid::new_v4().to_string(),
                file_id: file_id.clone(),
                content: chunk.content,
                embedding: None,
                chunk_index: chunk.chunk_index,
                start_char: chunk.start_char,
                end_char: chunk.end_char,
                file_name: file_name.clone(),
                uploaded_by: uploaded_by.clone(),
                chunk_size,
                overlap,
                created_at: created_at.clone(),
            })
            .collect()
    }
}

/// Chunk paired with the relevance score of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Matched chunk.
    pub record: ChunkRecord,
    /// Relevance score, always positive for a match.
    pub score: f32,
}

/// Aggregate view of one file's stored chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStats {
    /// Owning file identifier.
    pub file_id: String,
    /// Name of the file.
    pub file_name: String,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Latest chunk creation timestamp.
    pub last_updated: String,
}

pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
