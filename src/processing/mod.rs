//! Ingestion and retrieval pipeline: extraction, splitting, persistence, ranking, and answering.

pub mod chunking;
mod context;
mod locks;
mod mappers;
pub mod sanitize;
mod service;
pub mod types;

pub use context::NO_INFORMATION_ANSWER;
pub use service::{DEFAULT_PAGE_SIZE, DEFAULT_PREVIEW_LIMIT, MAX_PAGE_SIZE, RagApi, RagService};
pub use types::{
    AnswerError, AnswerOutcome, AnswerSource, ChunkPage, ChunkView, ChunkingError, DocumentList,
    DocumentPreview, DocumentSummary, IngestOutcome, Pagination, PreviewChunk, ProcessingError,
    SearchError, SearchResults,
};
