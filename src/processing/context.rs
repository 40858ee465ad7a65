//! Bounded answer context assembled from ranked chunks.

use crate::store::ScoredChunk;

/// Answer returned when retrieval finds no supporting chunk.
pub const NO_INFORMATION_ANSWER: &str =
    "Sorry, no information related to your question was found in the uploaded documents.";

/// Label each hit with its 1-based rank and keep the total under `char_cap` characters.
///
/// The entry that crosses the cap is cut at the cap and nothing after it is kept. A cap of 0
/// disables truncation.
pub(crate) fn build_context(hits: &[ScoredChunk], char_cap: usize) -> Vec<String> {
    let mut context = Vec::with_capacity(hits.len());
    let mut used = 0;

    for (rank, hit) in hits.iter().enumerate() {
        let entry = format!("[Document {}] {}", rank + 1, hit.record.content);
        if char_cap == 0 {
            context.push(entry);
            continue;
        }

        let remaining = char_cap.saturating_sub(used);
        if remaining == 0 {
            break;
        }
        let length = entry.chars().count();
        if length <= remaining {
            used += length;
            context.push(entry);
        } else {
            context.push(entry.chars().take(remaining).collect());
            break;
        }
    }

    context
}
