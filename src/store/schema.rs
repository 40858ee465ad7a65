//! Full-text index schema for chunk content.

use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};

/// Tokenizer applied to chunk content: lowercasing, English stemming.
pub const CONTENT_TOKENIZER: &str = "en_stem";

/// Index layout for chunk content.
///
/// Only `content` is tokenized. The raw identifiers are stored so a hit can be mapped back to the
/// committed record without keeping a second copy of the text inside the index.
#[derive(Clone)]
pub struct ChunkSchema {
    schema: Schema,
    pub content_field: Field,
    pub file_id_field: Field,
    pub chunk_index_field: Field,
}

impl ChunkSchema {
    /// Build the schema: stemmed positional `content`, raw stored `file_id`, stored `chunk_index`.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::default();
        let content_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(CONTENT_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let content_field = builder.add_text_field("content", content_options);
        let file_id_field = builder.add_text_field("file_id", STRING | STORED);
        let chunk_index_field = builder.add_u64_field("chunk_index", STORED);

        Self {
            schema: builder.build(),
            content_field,
            file_id_field,
            chunk_index_field,
        }
    }

    /// Underlying `tantivy` schema used to create the index.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_indexed_but_not_stored() {
        let schema = ChunkSchema::build();
        let content = schema.schema().get_field_entry(schema.content_field);
        assert!(content.is_indexed());
        assert!(!content.is_stored());

        let file_id = schema.schema().get_field_entry(schema.file_id_field);
        assert!(file_id.is_stored());
        assert_eq!(file_id.name(), "file_id");
    }
}
