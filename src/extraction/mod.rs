//! Text extraction from stored documents.
//!
//! Plain-text media types are read verbatim. PDFs go through `pdf-extract` and `.docx` archives
//! through the WordprocessingML flattener; both run on the blocking pool. Formats without an
//! extractor fail with [`ExtractionError::UnsupportedFormat`] instead of returning garbled text.
//! Extraction only ever reads the source file.

mod docx;
mod media;

pub use media::MediaType;

use std::path::Path;
use thiserror::Error;

/// Errors produced while turning a stored file into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No extractor exists for the declared media type.
    #[error("unsupported media type: {0}")]
    UnsupportedFormat(String),
    /// Source file could not be read.
    #[error("failed to read source file: {0}")]
    Io(#[from] std::io::Error),
    /// Format-specific extraction failed.
    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Turns a stored file into raw text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new extractor.
    pub const fn new() -> Self {
        Self
    }

    /// Extract the text of `path`, interpreting it as `media_type`.
    ///
    /// The declared type wins; the extension is consulted only for generic declarations.
    pub async fn extract(&self, path: &Path, media_type: &str) -> Result<String, ExtractionError> {
        let media = MediaType::resolve(media_type, path)
            .ok_or_else(|| ExtractionError::UnsupportedFormat(media_type.to_string()))?;
        tracing::debug!(path = %path.display(), media = media.as_mime(), "Extracting text");

        match media {
            MediaType::PlainText | MediaType::Markdown => {
                let bytes = tokio::fs::read(path).await?;
                decode_utf8(bytes)
            }
            MediaType::Pdf => {
                let bytes = tokio::fs::read(path).await?;
                run_blocking(move || {
                    pdf_extract::extract_text_from_mem(&bytes)
                        .map_err(|error| ExtractionError::Failed(format!("PDF: {error}")))
                })
                .await
            }
            MediaType::Docx => {
                let bytes = tokio::fs::read(path).await?;
                run_blocking(move || docx::extract_docx_text(&bytes)).await
            }
            MediaType::LegacyWord => Err(ExtractionError::UnsupportedFormat(
                media.as_mime().to_string(),
            )),
        }
    }
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let mut text = String::from_utf8(bytes)
        .map_err(|error| ExtractionError::Failed(format!("text is not valid UTF-8: {error}")))?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }
    Ok(text)
}

async fn run_blocking<F>(job: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|error| ExtractionError::Failed(format!("extraction task failed: {error}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(bytes).expect("write");
        (dir, path)
    }

    #[tokio::test]
    async fn reads_plain_text_verbatim_and_strips_bom() {
        let (_dir, path) = write_temp("notes.md", "\u{feff}# Title\n\nBody".as_bytes());
        let text = TextExtractor::new()
            .extract(&path, "text/markdown")
            .await
            .expect("text");
        assert_eq!(text, "# Title\n\nBody");
        assert!(path.exists(), "extraction must not remove the source");
    }

    #[tokio::test]
    async fn rejects_unknown_media_types() {
        let (_dir, path) = write_temp("image.png", b"\x89PNG");
        let error = TextExtractor::new()
            .extract(&path, "image/png")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedFormat(mime) if mime == "image/png"));
    }

    #[tokio::test]
    async fn legacy_word_documents_have_no_extractor() {
        let (_dir, path) = write_temp("old.doc", b"\xd0\xcf\x11\xe0");
        let error = TextExtractor::new()
            .extract(&path, "application/msword")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_extraction_failure() {
        let (_dir, path) = write_temp("broken.txt", &[0xff, 0xfe, 0x00, 0xd8]);
        let error = TextExtractor::new()
            .extract(&path, "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Failed(_)));
    }

    #[tokio::test]
    async fn missing_files_surface_io_errors() {
        let error = TextExtractor::new()
            .extract(Path::new("/nonexistent/docrag/file.txt"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Io(_)));
    }

    #[tokio::test]
    async fn corrupt_pdf_fails_cleanly() {
        let (_dir, path) = write_temp("broken.pdf", b"not really a pdf");
        let error = TextExtractor::new()
            .extract(&path, "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(error, ExtractionError::Failed(_)));
    }
}
