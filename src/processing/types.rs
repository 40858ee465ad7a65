//! Core data types and error definitions for the ingestion and retrieval pipeline.

use serde::Serialize;
use thiserror::Error;

use crate::{
    answering::AnsweringClientError,
    extraction::ExtractionError,
    files::FileRegistryError,
    store::{ChunkRecord, StoreError},
};

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new text in a chunk.
    #[error("overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap {
        /// Requested overlap.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
    /// Non-empty text produced no chunks.
    #[error("splitting {chars} characters produced no chunks")]
    EmptyOutput {
        /// Length of the input in characters.
        chars: usize,
    },
}

/// Errors emitted by ingestion and chunk management operations.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// No extractor exists for the file's media type.
    #[error("Unsupported media type: {0}")]
    UnsupportedFormat(String),
    /// Extraction of a supported format failed.
    #[error("Failed to extract text: {0}")]
    Extraction(ExtractionError),
    /// Extraction produced nothing but whitespace.
    #[error("Document {0} contains no extractable text")]
    EmptyDocument(String),
    /// Splitting failed.
    #[error("Failed to split document: {0}")]
    Split(#[from] ChunkingError),
    /// Chunk store rejected the operation.
    #[error("Chunk persistence failed: {0}")]
    Persistence(#[from] StoreError),
    /// File is unknown to the file registry.
    #[error("File not found: {0}")]
    NotFound(String),
    /// File registry rejected the operation.
    #[error("File registry failed: {0}")]
    FileRegistry(#[from] FileRegistryError),
}

impl From<ExtractionError> for ProcessingError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::UnsupportedFormat(media_type) => Self::UnsupportedFormat(media_type),
            other => Self::Extraction(other),
        }
    }
}

/// Errors emitted while ranking chunks.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query was empty or whitespace.
    #[error("Query required")]
    QueryRequired,
    /// Chunk store failed to execute the query.
    #[error("Search failed: {0}")]
    Store(#[from] StoreError),
}

/// Errors emitted while composing an answer.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Question was empty or whitespace.
    #[error("Question required")]
    QuestionRequired,
    /// Retrieval of supporting chunks failed.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// Answering provider failed to produce text.
    #[error("Failed to generate answer: {0}")]
    Answering(#[from] AnsweringClientError),
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Committed chunks in index order.
    pub chunks: Vec<ChunkRecord>,
    /// Chunk size used by the splitter.
    pub chunk_size: usize,
    /// Overlap used by the splitter.
    pub overlap: usize,
}

impl IngestOutcome {
    /// Number of committed chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Chunk as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkView {
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
    /// Chunk text.
    pub content: String,
    /// Relevance score, present on search results only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Pagination block attached to chunk listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page returned.
    pub current: usize,
    /// Number of pages available.
    pub total: usize,
    /// Number of chunks owned by the file.
    pub count: usize,
}

/// One page of a file's chunks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkPage {
    /// Chunks on the page, sorted by index.
    pub chunks: Vec<ChunkView>,
    /// Page position.
    pub pagination: Pagination,
}

/// Ranked search results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    /// Normalized query text.
    pub query: String,
    /// Matches, best first.
    pub results: Vec<ChunkView>,
}

/// Source cited by an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSource {
    /// Name of the file the chunk belongs to.
    pub file_name: String,
    /// Index of the cited chunk.
    pub chunk_index: usize,
    /// Relevance score of the cited chunk.
    pub score: f32,
    /// Bounded excerpt of the chunk content.
    pub content_excerpt: String,
}

/// Answer composed from retrieved chunks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    /// Answer text.
    pub answer: String,
    /// Chunks the answer was composed from, in rank order.
    pub sources: Vec<AnswerSource>,
    /// Normalized question text.
    pub question: String,
    /// Number of chunks retrieved.
    pub found_chunks: usize,
}

/// File that owns chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Name of the file.
    pub file_name: String,
    /// Identifier of the file.
    pub file_id: String,
    /// Identity of the uploader.
    pub uploaded_by: String,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Latest chunk creation timestamp (RFC3339).
    pub last_updated: String,
}

/// Every file that owns chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    /// Files, most recently updated first.
    pub documents: Vec<DocumentSummary>,
    /// Number of files listed.
    pub total_documents: usize,
}

/// Excerpt of one chunk in a document preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewChunk {
    /// Bounded excerpt of the chunk content.
    pub content: String,
    /// Index of the chunk.
    pub chunk_index: usize,
}

/// Leading chunks of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPreview {
    /// Requested file name.
    pub file_name: String,
    /// Leading chunks by index.
    pub preview: Vec<PreviewChunk>,
    /// Number of chunks stored under the name.
    pub total_chunks: usize,
}
