//! Service coordinating extraction, splitting, chunk persistence, ranking, and answering.

use crate::{
    answering::{AnswerRequest, AnsweringClient},
    config::Config,
    extraction::{MediaType, TextExtractor},
    files::{FileRecord, FileRegistry},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        chunking::split_text,
        context::{NO_INFORMATION_ANSWER, build_context},
        locks::FileLocks,
        mappers::{map_document, map_preview_chunk, map_record, map_scored_chunk, map_source},
        sanitize::{page_count, resolve_limit, resolve_page, resolve_page_size, sanitize_text},
        types::{
            AnswerError, AnswerOutcome, ChunkPage, ChunkingError, DocumentList, DocumentPreview,
            IngestOutcome, Pagination, ProcessingError, SearchError, SearchResults,
        },
    },
    store::{ChunkBatch, ChunkStore, ScoredChunk, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Default number of chunks shown by a document preview.
pub const DEFAULT_PREVIEW_LIMIT: usize = 3;
/// Default page size of chunk listings.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Largest accepted page size of chunk listings.
pub const MAX_PAGE_SIZE: usize = 100;

/// Runs the ingestion pipeline and the retrieval operations over one chunk store.
///
/// Ingestion of a file is a single sequential pipeline guarded by a per-file lock; independent
/// files ingest concurrently and the store serializes their commits. Construct the service once
/// near process start and share it through an `Arc`.
pub struct RagService {
    store: Arc<dyn ChunkStore>,
    files: Arc<dyn FileRegistry>,
    answering: Box<dyn AnsweringClient>,
    extractor: TextExtractor,
    settings: Config,
    locks: FileLocks,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, preload).
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Register an uploaded file and ingest it. Unsupported media types and already registered
    /// file identifiers are rejected before anything is registered.
    async fn upload(&self, file: FileRecord) -> Result<IngestOutcome, ProcessingError>;

    /// Extract, split, and persist an already registered file. Unregistered files are `NotFound`.
    async fn ingest(&self, file: &FileRecord) -> Result<IngestOutcome, ProcessingError>;

    /// Delete every chunk of a file, returning how many were removed.
    async fn delete_file_chunks(&self, file_id: &str) -> Result<usize, ProcessingError>;

    /// Delete a file record together with its chunks.
    async fn delete_file(&self, file_id: &str) -> Result<usize, ProcessingError>;

    /// Page through a file's chunks by index.
    async fn list_chunks(
        &self,
        file_id: &str,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<ChunkPage, ProcessingError>;

    /// Rank chunks against a free-text query.
    async fn search(&self, query: &str, limit: Option<i64>) -> Result<SearchResults, SearchError>;

    /// Answer a question from the best matching chunks.
    async fn answer_question(
        &self,
        question: &str,
        max_chunks: Option<i64>,
    ) -> Result<AnswerOutcome, AnswerError>;

    /// List every file that owns chunks.
    async fn list_documents(&self) -> Result<DocumentList, ProcessingError>;

    /// Show the leading chunks stored under a file name.
    async fn preview_document(
        &self,
        file_name: &str,
        limit: Option<i64>,
    ) -> Result<DocumentPreview, ProcessingError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RagService {
    /// Build a service over the given collaborators.
    pub fn new(
        store: Arc<dyn ChunkStore>,
        files: Arc<dyn FileRegistry>,
        answering: Box<dyn AnsweringClient>,
        settings: Config,
    ) -> Self {
        Self {
            store,
            files,
            answering,
            extractor: TextExtractor::new(),
            settings,
            locks: FileLocks::new(),
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Register `file` and ingest it.
    ///
    /// The file lock is held from registration until ingestion settles, so a concurrent delete of
    /// the same file observes either nothing or the finished ingestion.
    pub async fn upload(&self, file: FileRecord) -> Result<IngestOutcome, ProcessingError> {
        if MediaType::resolve(&file.media_type, &file.stored_path).is_none() {
            return Err(ProcessingError::UnsupportedFormat(file.media_type));
        }
        let _guard = self.locks.acquire(&file.file_id).await;
        self.files.register(file.clone()).await?;
        self.ingest_locked(&file).await
    }

    /// Extract, split, and persist an already registered `file`.
    ///
    /// On any failure the partial chunk set is removed and the file record is rolled back, so a
    /// file never remains registered without chunks.
    pub async fn ingest(&self, file: &FileRecord) -> Result<IngestOutcome, ProcessingError> {
        let _guard = self.locks.acquire(&file.file_id).await;
        if self.files.get(&file.file_id).await?.is_none() {
            return Err(ProcessingError::NotFound(file.file_id.clone()));
        }
        self.ingest_locked(file).await
    }

    /// Ingestion body; the caller holds the file lock.
    async fn ingest_locked(&self, file: &FileRecord) -> Result<IngestOutcome, ProcessingError> {
        tracing::info!(
            file_id = %file.file_id,
            filename = %file.filename,
            media_type = %file.media_type,
            bytes = file.byte_size,
            "Ingesting document"
        );

        if self.store.count_for_file(&file.file_id).await? > 0 {
            return Err(StoreError::AlreadyStored(file.file_id.clone()).into());
        }

        match self.run_pipeline(file).await {
            Ok(outcome) => {
                self.metrics
                    .record_document(outcome.chunk_count() as u64, outcome.chunk_size as u64);
                tracing::info!(
                    file_id = %file.file_id,
                    chunks = outcome.chunk_count(),
                    chunk_size = outcome.chunk_size,
                    overlap = outcome.overlap,
                    "Document ingested"
                );
                Ok(outcome)
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::warn!(file_id = %file.file_id, %error, "Ingestion failed; rolling back file record");
                if let Err(rollback_error) = self.files.remove(&file.file_id).await {
                    tracing::warn!(
                        file_id = %file.file_id,
                        error = %rollback_error,
                        "Failed to roll back file record"
                    );
                }
                Err(error)
            }
        }
    }

    async fn run_pipeline(&self, file: &FileRecord) -> Result<IngestOutcome, ProcessingError> {
        let text = self
            .extractor
            .extract(&file.stored_path, &file.media_type)
            .await?;
        if text.trim().is_empty() {
            return Err(ProcessingError::EmptyDocument(file.file_id.clone()));
        }

        let chunk_size = self.settings.chunk_size;
        let overlap = self.settings.chunk_overlap;
        let chunks = split_text(&text, chunk_size, overlap)?;
        if chunks.is_empty() {
            return Err(ChunkingError::EmptyOutput {
                chars: text.chars().count(),
            }
            .into());
        }
        tracing::debug!(
            file_id = %file.file_id,
            chars = text.chars().count(),
            chunk_size,
            overlap,
            chunks = chunks.len(),
            "Split document"
        );

        let batch = ChunkBatch {
            file_id: file.file_id.clone(),
            file_name: file.filename.clone(),
            uploaded_by: file.uploaded_by.clone(),
            chunk_size,
            overlap,
            chunks,
        };
        match self.store.save_all(batch).await {
            Ok(chunks) => Ok(IngestOutcome {
                chunks,
                chunk_size,
                overlap,
            }),
            Err(error) => {
                if !matches!(error, StoreError::AlreadyStored(_)) {
                    self.cleanup_partial(&file.file_id).await;
                }
                Err(error.into())
            }
        }
    }

    async fn cleanup_partial(&self, file_id: &str) {
        match self.store.delete_all_for_file(file_id).await {
            Ok(0) => {}
            Ok(removed) => tracing::warn!(file_id, removed, "Removed partially persisted chunks"),
            Err(error) => tracing::warn!(file_id, %error, "Failed to clean up partial chunks"),
        }
    }

    /// Delete every chunk of `file_id`, waiting for an in-flight ingestion of the same file.
    pub async fn delete_file_chunks(&self, file_id: &str) -> Result<usize, ProcessingError> {
        let _guard = self.locks.acquire(file_id).await;
        let deleted = self.store.delete_all_for_file(file_id).await?;
        tracing::info!(file_id, deleted, "Deleted file chunks");
        Ok(deleted)
    }

    /// Delete the file record and its chunks as one operation.
    ///
    /// Chunks are removed first; when the file record cannot be removed afterwards the chunks are
    /// restored before the error is returned.
    pub async fn delete_file(&self, file_id: &str) -> Result<usize, ProcessingError> {
        let _guard = self.locks.acquire(file_id).await;
        if self.files.get(file_id).await?.is_none() {
            return Err(ProcessingError::NotFound(file_id.to_string()));
        }

        let removed = self.store.remove_all_for_file(file_id).await?;
        let deleted = removed.len();
        if let Err(error) = self.files.remove(file_id).await {
            tracing::warn!(file_id, %error, "File record removal failed; restoring chunks");
            if let Err(restore_error) = self.store.restore(removed).await {
                tracing::warn!(file_id, error = %restore_error, "Failed to restore chunks");
            }
            return Err(error.into());
        }

        tracing::info!(file_id, deleted, "Deleted file and chunks");
        Ok(deleted)
    }

    /// Page through a file's chunks sorted by index.
    pub async fn list_chunks(
        &self,
        file_id: &str,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<ChunkPage, ProcessingError> {
        let current = resolve_page(page);
        let page_size = resolve_page_size(page_size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let count = self.store.count_for_file(file_id).await?;
        let chunks = self
            .store
            .find_by_file(file_id, current, page_size)
            .await?
            .into_iter()
            .map(map_record)
            .collect();

        Ok(ChunkPage {
            chunks,
            pagination: Pagination {
                current,
                total: page_count(count, page_size),
                count,
            },
        })
    }

    async fn rank(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        let hits = self.store.search(query, limit).await?;
        self.metrics.record_search();
        tracing::debug!(query, limit, hits = hits.len(), "Ranked chunks");
        Ok(hits)
    }

    /// Rank chunks against `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<SearchResults, SearchError> {
        let query = sanitize_text(query).ok_or(SearchError::QueryRequired)?;
        let limit = resolve_limit(
            limit,
            self.settings.search_default_limit,
            self.settings.search_max_limit,
        );
        let results = self
            .rank(&query, limit)
            .await?
            .into_iter()
            .map(map_scored_chunk)
            .collect();
        Ok(SearchResults { query, results })
    }

    /// Answer `question` from at most `max_chunks` retrieved chunks.
    pub async fn answer_question(
        &self,
        question: &str,
        max_chunks: Option<i64>,
    ) -> Result<AnswerOutcome, AnswerError> {
        let question = sanitize_text(question).ok_or(AnswerError::QuestionRequired)?;
        let limit = resolve_limit(
            max_chunks,
            self.settings.answer_default_max_chunks,
            self.settings.search_max_limit,
        );
        let hits = self.rank(&question, limit).await?;

        if hits.is_empty() {
            tracing::info!(question = %question, "No chunks found for question");
            self.metrics.record_answer();
            return Ok(AnswerOutcome {
                answer: NO_INFORMATION_ANSWER.to_string(),
                sources: Vec::new(),
                question,
                found_chunks: 0,
            });
        }

        let context = build_context(&hits, self.settings.answer_context_char_cap);
        let answer = self
            .answering
            .generate_answer(AnswerRequest {
                question: question.clone(),
                context,
                model: self.settings.answering_model.clone(),
            })
            .await?;
        let sources = hits
            .iter()
            .map(|hit| map_source(hit, self.settings.source_excerpt_chars))
            .collect();

        self.metrics.record_answer();
        tracing::info!(question = %question, found_chunks = hits.len(), "Answered question");
        Ok(AnswerOutcome {
            answer,
            sources,
            question,
            found_chunks: hits.len(),
        })
    }

    /// List every file that owns chunks, most recently updated first.
    pub async fn list_documents(&self) -> Result<DocumentList, ProcessingError> {
        let documents: Vec<_> = self
            .store
            .list_documents()
            .await?
            .into_iter()
            .map(map_document)
            .collect();
        Ok(DocumentList {
            total_documents: documents.len(),
            documents,
        })
    }

    /// Show the first chunks stored under `file_name`.
    pub async fn preview_document(
        &self,
        file_name: &str,
        limit: Option<i64>,
    ) -> Result<DocumentPreview, ProcessingError> {
        let limit = resolve_limit(limit, DEFAULT_PREVIEW_LIMIT, MAX_PAGE_SIZE);
        let (records, total_chunks) = self.store.find_by_file_name(file_name, limit).await?;
        if total_chunks == 0 {
            return Err(ProcessingError::NotFound(file_name.to_string()));
        }

        let excerpt_chars = self.settings.preview_excerpt_chars;
        Ok(DocumentPreview {
            file_name: file_name.to_string(),
            preview: records
                .iter()
                .map(|record| map_preview_chunk(record, excerpt_chars))
                .collect(),
            total_chunks,
        })
    }

    /// Return a snapshot of pipeline counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn upload(&self, file: FileRecord) -> Result<IngestOutcome, ProcessingError> {
        RagService::upload(self, file).await
    }

    async fn ingest(&self, file: &FileRecord) -> Result<IngestOutcome, ProcessingError> {
        RagService::ingest(self, file).await
    }

    async fn delete_file_chunks(&self, file_id: &str) -> Result<usize, ProcessingError> {
        RagService::delete_file_chunks(self, file_id).await
    }

    async fn delete_file(&self, file_id: &str) -> Result<usize, ProcessingError> {
        RagService::delete_file(self, file_id).await
    }

    async fn list_chunks(
        &self,
        file_id: &str,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<ChunkPage, ProcessingError> {
        RagService::list_chunks(self, file_id, page, page_size).await
    }

    async fn search(&self, query: &str, limit: Option<i64>) -> Result<SearchResults, SearchError> {
        RagService::search(self, query, limit).await
    }

    async fn answer_question(
        &self,
        question: &str,
        max_chunks: Option<i64>,
    ) -> Result<AnswerOutcome, AnswerError> {
        RagService::answer_question(self, question, max_chunks).await
    }

    async fn list_documents(&self) -> Result<DocumentList, ProcessingError> {
        RagService::list_documents(self).await
    }

    async fn preview_document(
        &self,
        file_name: &str,
        limit: Option<i64>,
    ) -> Result<DocumentPreview, ProcessingError> {
        RagService::preview_document(self, file_name, limit).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}
