//! Mapping helpers from stored records to caller-facing views.

use crate::{
    processing::types::{AnswerSource, ChunkView, DocumentSummary, PreviewChunk},
    store::{ChunkRecord, DocumentStats, ScoredChunk},
};

const ELLIPSIS: &str = "...";

/// First `max_chars` characters of `content`, with an ellipsis appended only when truncated.
pub(crate) fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => format!("{}{ELLIPSIS}", &content[..byte_offset]),
        None => content.to_string(),
    }
}

pub(crate) fn map_record(record: ChunkRecord) -> ChunkView {
    ChunkView {
        chunk_index: record.chunk_index,
        start_char: record.start_char,
        end_char: record.end_char,
        file_name: record.file_name,
        uploaded_by: record.uploaded_by,
        content: record.content,
        score: None,
    }
}

pub(crate) fn map_scored_chunk(hit: ScoredChunk) -> ChunkView {
    let ScoredChunk { record, score } = hit;
    ChunkView {
        score: Some(score),
        ..map_record(record)
    }
}

pub(crate) fn map_source(hit: &ScoredChunk, excerpt_chars: usize) -> AnswerSource {
    AnswerSource {
        file_name: hit.record.file_name.clone(),
        chunk_index: hit.record.chunk_index,
        score: hit.score,
        content_excerpt: excerpt(&hit.record.content, excerpt_chars),
    }
}

pub(crate) fn map_preview_chunk(record: &ChunkRecord, excerpt_chars: usize) -> PreviewChunk {
    PreviewChunk {
        content: excerpt(&record.content, excerpt_chars),
        chunk_index: record.chunk_index,
    }
}

pub(crate) fn map_document(stats: DocumentStats) -> DocumentSummary {
    DocumentSummary {
        file_name: stats.file_name,
        file_id: stats.file_id,
        uploaded_by: stats.uploaded_by,
        chunk_count: stats.chunk_count,
        last_updated: stats.last_updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ChunkRecord {
        ChunkRecord {
            chunk_id: "c-1".into(),
            file_id: "f-1".into(),
            content: "Refunds are issued within thirty days.".into(),
            embedding: None,
            chunk_index: 2,
            start_char: 1600,
            end_char: 1638,
            file_name: "policy.txt".into(),
            uploaded_by: "admin@example.org".into(),
            chunk_size: 1000,
            overlap: 200,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn excerpt_marks_truncation_only() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("exactly10!", 10), "exactly10!");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
        assert_eq!(excerpt("anything", 0), "...");
    }

    #[test]
    fn scored_chunks_keep_their_score_on_the_wire() {
        let view = map_scored_chunk(ScoredChunk {
            record: record(),
            score: 1.5,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["chunkIndex"], 2);
        assert_eq!(json["startChar"], 1600);
        assert_eq!(json["fileName"], "policy.txt");
        assert_eq!(json["uploadedBy"], "admin@example.org");
        assert_eq!(json["score"], 1.5);
        assert!(json.get("chunkId").is_none());
    }

    #[test]
    fn listed_chunks_omit_score() {
        let json = serde_json::to_value(map_record(record())).unwrap();
        assert!(json.get("score").is_none());
        assert_eq!(json["content"], "Refunds are issued within thirty days.");
    }

    #[test]
    fn sources_carry_bounded_excerpts() {
        let hit = ScoredChunk {
            record: record(),
            score: 0.75,
        };
        let source = map_source(&hit, 7);
        assert_eq!(source.content_excerpt, "Refunds...");
        assert_eq!(source.chunk_index, 2);
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["contentExcerpt"], "Refunds...");
    }
}
