use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and retrieval activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_ingested: AtomicU64,
    chunks_ingested: AtomicU64,
    ingestion_failures: AtomicU64,
    searches_served: AtomicU64,
    questions_answered: AtomicU64,
    last_chunk_size: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested document, the number of chunks produced, and the chunk size used.
    pub fn record_document(&self, chunk_count: u64, chunk_size: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_ingested
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_size.store(chunk_size, Ordering::Relaxed);
    }

    /// Record an ingestion that was aborted and rolled back.
    pub fn record_failure(&self) {
        self.ingestion_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed search.
    pub fn record_search(&self) {
        self.searches_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed answer.
    pub fn record_answer(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_chunk_size = self.last_chunk_size.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
            ingestion_failures: self.ingestion_failures.load(Ordering::Relaxed),
            searches_served: self.searches_served.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            last_chunk_size: (last_chunk_size > 0).then_some(last_chunk_size),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Number of documents ingested since startup.
    pub documents_ingested: u64,
    /// Total chunk count produced across all ingested documents.
    pub chunks_ingested: u64,
    /// Ingestions that failed and were rolled back.
    pub ingestion_failures: u64,
    /// Searches served, including those answering questions.
    pub searches_served: u64,
    /// Questions answered, including canned no-information answers.
    pub questions_answered: u64,
    /// Chunk size used by the most recent ingestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_size: Option<u64>,
}
