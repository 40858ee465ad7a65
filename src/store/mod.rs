//! Chunk persistence and full-text retrieval.

mod indexed;
mod schema;
mod types;

pub use indexed::IndexedChunkStore;
pub use types::{ChunkBatch, ChunkRecord, DocumentStats, ScoredChunk, StoreError};

use async_trait::async_trait;

/// Persistence seam for chunk records.
///
/// Implementations must make a committed batch visible to the next [`ChunkStore::search`] call and
/// must never expose part of a batch.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Commit every chunk of one file in a single batch, returning the stored records.
    async fn save_all(&self, batch: ChunkBatch) -> Result<Vec<ChunkRecord>, StoreError>;

    /// Remove every chunk owned by `file_id`, returning the removed records in index order.
    async fn remove_all_for_file(&self, file_id: &str) -> Result<Vec<ChunkRecord>, StoreError>;

    /// Re-insert records previously returned by [`ChunkStore::remove_all_for_file`].
    async fn restore(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError>;

    /// Number of chunks owned by `file_id`.
    async fn count_for_file(&self, file_id: &str) -> Result<usize, StoreError>;

    /// One page of a file's chunks sorted by index. `page` is 1-based.
    async fn find_by_file(
        &self,
        file_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ChunkRecord>, StoreError>;

    /// Rank chunks against `query`. Returns at most `limit` matches, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// One entry per file that owns chunks, most recently updated first.
    async fn list_documents(&self) -> Result<Vec<DocumentStats>, StoreError>;

    /// First `limit` chunks by index among files named `file_name`, plus the total match count.
    async fn find_by_file_name(
        &self,
        file_name: &str,
        limit: usize,
    ) -> Result<(Vec<ChunkRecord>, usize), StoreError>;

    /// Delete every chunk owned by `file_id`. Deleting an unknown file returns 0.
    async fn delete_all_for_file(&self, file_id: &str) -> Result<usize, StoreError> {
        Ok(self.remove_all_for_file(file_id).await?.len())
    }
}
