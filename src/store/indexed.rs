//! In-memory chunk store backed by a `tantivy` RAM index.
//!
//! Committed records live in a map keyed by file; the index only carries the tokenized content and
//! the `(file_id, chunk_index)` pair needed to map a hit back to its record. All writes go through a
//! single index writer. Each batch is one commit followed by a reader reload, so a search issued
//! after a write returns observes that write.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
    collector::{Count, TopDocs},
    doc,
    query::QueryParser,
    schema::Value,
};
use tokio::sync::{Mutex, RwLock};

use super::{
    ChunkStore,
    schema::ChunkSchema,
    types::{ChunkBatch, ChunkRecord, DocumentStats, ScoredChunk, StoreError},
};
use crate::config::MIN_INDEX_HEAP_BYTES;

/// Chunk store with BM25 ranking over an English-stemmed content index.
pub struct IndexedChunkStore {
    schema: ChunkSchema,
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    records: RwLock<BTreeMap<String, Vec<ChunkRecord>>>,
}

impl IndexedChunkStore {
    /// Create an empty store whose index writer may buffer up to `heap_bytes`.
    pub fn new(heap_bytes: usize) -> Result<Self, StoreError> {
        let schema = ChunkSchema::build();
        let index = Index::create_in_ram(schema.schema().clone());
        let writer: IndexWriter =
            index.writer_with_num_threads(1, heap_bytes.max(MIN_INDEX_HEAP_BYTES))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        tracing::debug!(heap_bytes, "Chunk index ready");

        Ok(Self {
            schema,
            index,
            reader,
            writer: Mutex::new(writer),
            records: RwLock::new(BTreeMap::new()),
        })
    }

    fn add_documents(
        &self,
        writer: &mut IndexWriter,
        records: &[ChunkRecord],
    ) -> Result<(), StoreError> {
        for record in records {
            writer.add_document(doc!(
                self.schema.content_field => record.content.as_str(),
                self.schema.file_id_field => record.file_id.as_str(),
                self.schema.chunk_index_field => record.chunk_index as u64,
            ))?;
        }
        Ok(())
    }

    /// Stage operations on the writer and commit them as one unit.
    ///
    /// Staged operations are rolled back when staging or the commit fails.
    fn commit_staged<F>(&self, writer: &mut IndexWriter, stage: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut IndexWriter) -> Result<(), StoreError>,
    {
        let staged = stage(writer).and_then(|()| writer.commit().map_err(StoreError::from));
        if let Err(error) = staged {
            if let Err(rollback_error) = writer.rollback() {
                tracing::warn!(error = %rollback_error, "Index rollback failed");
            }
            return Err(error);
        }
        self.reader.reload()?;
        Ok(())
    }

    /// Resolve query hits to `(file_id, chunk_index, score)` triples.
    fn collect_hits(&self, query: &str) -> Result<Vec<(String, usize, f32)>, StoreError> {
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.schema.content_field]);
        let (parsed, errors) = parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(query, ignored = errors.len(), "Ignored query syntax errors");
        }

        let total = searcher.search(parsed.as_ref(), &Count)?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let top_docs = searcher.search(parsed.as_ref(), &TopDocs::with_limit(total))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let document: TantivyDocument = searcher.doc(address)?;
            let file_id = document
                .get_first(self.schema.file_id_field)
                .and_then(|value| value.as_str())
                .map(str::to_string);
            let chunk_index = document
                .get_first(self.schema.chunk_index_field)
                .and_then(|value| value.as_u64());
            if let (Some(file_id), Some(chunk_index)) = (file_id, chunk_index) {
                hits.push((file_id, chunk_index as usize, score));
            }
        }
        Ok(hits)
    }
}

fn group_by_file(records: Vec<ChunkRecord>) -> BTreeMap<String, Vec<ChunkRecord>> {
    let mut grouped: BTreeMap<String, Vec<ChunkRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.file_id.clone())
            .or_default()
            .push(record);
    }
    for chunks in grouped.values_mut() {
        chunks.sort_by_key(|record| record.chunk_index);
    }
    grouped
}

#[async_trait]
impl ChunkStore for IndexedChunkStore {
    async fn save_all(&self, batch: ChunkBatch) -> Result<Vec<ChunkRecord>, StoreError> {
        let file_id = batch.file_id.clone();
        let mut records = batch.into_records();
        if records.is_empty() {
            return Ok(records);
        }
        records.sort_by_key(|record| record.chunk_index);

        let mut writer = self.writer.lock().await;
        if self.records.read().await.contains_key(&file_id) {
            return Err(StoreError::AlreadyStored(file_id));
        }
        self.commit_staged(&mut writer, |writer| {
            self.add_documents(writer, &records)
        })?;
        self.records
            .write()
            .await
            .insert(file_id.clone(), records.clone());
        tracing::debug!(file_id = %file_id, chunks = records.len(), "Committed chunk batch");
        Ok(records)
    }

    async fn remove_all_for_file(&self, file_id: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        let mut writer = self.writer.lock().await;
        if !self.records.read().await.contains_key(file_id) {
            return Ok(Vec::new());
        }
        let term = Term::from_field_text(self.schema.file_id_field, file_id);
        self.commit_staged(&mut writer, |writer| {
            writer.delete_term(term);
            Ok(())
        })?;
        let removed = self
            .records
            .write()
            .await
            .remove(file_id)
            .unwrap_or_default();
        tracing::debug!(file_id, chunks = removed.len(), "Removed chunk set");
        Ok(removed)
    }

    async fn restore(&self, records: Vec<ChunkRecord>) -> Result<(), StoreError> {
        let grouped = group_by_file(records);
        if grouped.is_empty() {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        {
            let stored = self.records.read().await;
            if let Some(file_id) = grouped.keys().find(|file_id| stored.contains_key(*file_id)) {
                return Err(StoreError::AlreadyStored(file_id.clone()));
            }
        }
        self.commit_staged(&mut writer, |writer| {
            grouped
                .values()
                .try_for_each(|chunks| self.add_documents(writer, chunks))
        })?;
        self.records.write().await.extend(grouped);
        Ok(())
    }

    async fn count_for_file(&self, file_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(file_id)
            .map_or(0, Vec::len))
    }

    async fn find_by_file(
        &self,
        file_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<ChunkRecord>, StoreError> {
        let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
        Ok(self
            .records
            .read()
            .await
            .get(file_id)
            .map(|chunks| {
                chunks
                    .iter()
                    .skip(offset)
                    .take(page_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        if limit == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.collect_hits(query)?;
        let records = self.records.read().await;
        let mut scored: Vec<ScoredChunk> = hits
            .into_iter()
            .filter_map(|(file_id, chunk_index, score)| {
                records
                    .get(&file_id)
                    .and_then(|chunks| chunks.get(chunk_index))
                    .filter(|record| record.chunk_index == chunk_index)
                    .map(|record| ScoredChunk {
                        record: record.clone(),
                        score,
                    })
            })
            .collect();
        drop(records);

        scored.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.record.chunk_index.cmp(&right.record.chunk_index))
                .then_with(|| left.record.file_id.cmp(&right.record.file_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentStats>, StoreError> {
        let records = self.records.read().await;
        let mut documents: Vec<DocumentStats> = records
            .iter()
            .filter_map(|(file_id, chunks)| {
                let first = chunks.first()?;
                let last_updated = chunks
                    .iter()
                    .map(|record| record.created_at.as_str())
                    .max()
                    .unwrap_or_default()
                    .to_string();
                Some(DocumentStats {
                    file_id: file_id.clone(),
                    file_name: first.file_name.clone(),
                    uploaded_by: first.uploaded_by.clone(),
                    chunk_count: chunks.len(),
                    last_updated,
                })
            })
            .collect();

        documents.sort_by(|left, right| {
            right
                .last_updated
                .cmp(&left.last_updated)
                .then_with(|| left.file_name.cmp(&right.file_name))
                .then_with(|| left.file_id.cmp(&right.file_id))
        });
        Ok(documents)
    }

    async fn find_by_file_name(
        &self,
        file_name: &str,
        limit: usize,
    ) -> Result<(Vec<ChunkRecord>, usize), StoreError> {
        let records = self.records.read().await;
        let mut matching: Vec<&ChunkRecord> = records
            .values()
            .flatten()
            .filter(|record| record.file_name == file_name)
            .collect();
        let total = matching.len();

        matching.sort_by(|left, right| {
            left.chunk_index
                .cmp(&right.chunk_index)
                .then_with(|| left.file_id.cmp(&right.file_id))
        });
        let preview = matching.into_iter().take(limit).cloned().collect();
        Ok((preview, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::chunking::TextChunk;

    fn store() -> IndexedChunkStore {
        IndexedChunkStore::new(MIN_INDEX_HEAP_BYTES).expect("index")
    }

    fn batch(file_id: &str, file_name: &str, contents: &[&str]) -> ChunkBatch {
        let mut offset = 0;
        let chunks = contents
            .iter()
            .enumerate()
            .map(|(chunk_index, content)| {
                let start_char = offset;
                offset += content.chars().count();
                TextChunk {
                    chunk_index,
                    start_char,
                    end_char: offset,
                    content: (*content).to_string(),
                }
            })
            .collect();
        ChunkBatch {
            file_id: file_id.into(),
            file_name: file_name.into(),
            uploaded_by: "admin@example.org".into(),
            chunk_size: 1000,
            overlap: 200,
            chunks,
        }
    }

    #[tokio::test]
    async fn saved_chunks_are_searchable_immediately() {
        let store = store();
        let records = store
            .save_all(batch("file-a", "a.txt", &["the quick brown fox"]))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].chunk_id.is_empty());
        assert_eq!(records[0].uploaded_by, "admin@example.org");

        let hits = store.search("fox", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.0);
        assert_eq!(hits[0].record.file_name, "a.txt");
    }

    #[tokio::test]
    async fn single_matching_chunk_is_the_only_result() {
        let store = store();
        store
            .save_all(batch(
                "file-a",
                "policy.txt",
                &[
                    "Shipping takes five business days.",
                    "Orders can be tracked online.",
                    "A refund is issued within thirty days of purchase.",
                    "Contact support for other questions.",
                ],
            ))
            .await
            .unwrap();

        let hits = store.search("refund", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.chunk_index, 2);
        assert!(hits[0].score > 0.0);

        let stemmed = store.search("refunds", 10).await.unwrap();
        assert_eq!(stemmed.len(), 1);

        assert!(store.search("warranty", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_limit_and_blank_query_return_nothing() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["alpha beta"]))
            .await
            .unwrap();
        assert!(store.search("alpha", 0).await.unwrap().is_empty());
        assert!(store.search("   ", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_syntax_characters_do_not_fail() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["alpha beta"]))
            .await
            .unwrap();
        let hits = store.search("alpha AND (beta:", 10).await;
        assert!(hits.is_ok());
        assert!(hits.unwrap().len() <= 1);
    }

    #[tokio::test]
    async fn equal_scores_are_ordered_by_chunk_index_then_file() {
        let store = store();
        store
            .save_all(batch("file-b", "b.txt", &["alpha beta", "alpha beta"]))
            .await
            .unwrap();
        store
            .save_all(batch("file-a", "a.txt", &["alpha beta"]))
            .await
            .unwrap();

        let hits = store.search("alpha", 10).await.unwrap();
        let order: Vec<(&str, usize)> = hits
            .iter()
            .map(|hit| (hit.record.file_id.as_str(), hit.record.chunk_index))
            .collect();
        assert_eq!(order, vec![("file-a", 0), ("file-b", 0), ("file-b", 1)]);

        let capped = store.search("alpha", 2).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[1].record.file_id, "file-b");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["alpha", "beta", "gamma"]))
            .await
            .unwrap();

        assert_eq!(store.delete_all_for_file("file-a").await.unwrap(), 3);
        assert_eq!(store.count_for_file("file-a").await.unwrap(), 0);
        assert!(store.search("beta", 10).await.unwrap().is_empty());
        assert_eq!(store.delete_all_for_file("file-a").await.unwrap(), 0);
        assert_eq!(store.delete_all_for_file("never-stored").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn second_batch_for_same_file_is_rejected() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["alpha"]))
            .await
            .unwrap();
        let error = store
            .save_all(batch("file-a", "a.txt", &["beta"]))
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::AlreadyStored(id) if id == "file-a"));
        assert!(store.search("beta", 10).await.unwrap().is_empty());
        assert_eq!(store.count_for_file("file-a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn restore_reinstates_removed_records() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["alpha", "beta"]))
            .await
            .unwrap();
        let removed = store.remove_all_for_file("file-a").await.unwrap();
        assert_eq!(removed.len(), 2);

        store.restore(removed.clone()).await.unwrap();
        assert_eq!(store.count_for_file("file-a").await.unwrap(), 2);
        let hits = store.search("beta", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record, removed[1]);
    }

    #[tokio::test]
    async fn pages_are_sorted_by_chunk_index() {
        let store = store();
        store
            .save_all(batch("file-a", "a.txt", &["c0", "c1", "c2", "c3", "c4"]))
            .await
            .unwrap();

        let first = store.find_by_file("file-a", 1, 2).await.unwrap();
        let last = store.find_by_file("file-a", 3, 2).await.unwrap();
        assert_eq!(
            first.iter().map(|r| r.chunk_index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(
            last.iter().map(|r| r.chunk_index).collect::<Vec<_>>(),
            vec![4]
        );
        assert!(store.find_by_file("file-a", 4, 2).await.unwrap().is_empty());
        assert!(store.find_by_file("missing", 1, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn documents_and_name_lookups_aggregate_per_file() {
        let store = store();
        store
            .save_all(batch("file-a", "guide.md", &["one", "two", "three", "four"]))
            .await
            .unwrap();
        store
            .save_all(batch("file-b", "notes.txt", &["five"]))
            .await
            .unwrap();

        let documents = store.list_documents().await.unwrap();
        assert_eq!(documents.len(), 2);
        let guide = documents
            .iter()
            .find(|doc| doc.file_id == "file-a")
            .expect("guide listed");
        assert_eq!(guide.chunk_count, 4);
        assert_eq!(guide.file_name, "guide.md");

        let (preview, total) = store.find_by_file_name("guide.md", 3).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(
            preview.iter().map(|r| r.chunk_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        let (none, zero) = store.find_by_file_name("absent.pdf", 3).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(zero, 0);
    }
}
