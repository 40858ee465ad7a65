//! Media type recognition for uploaded documents.

use std::path::Path;

/// Document formats known to the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// `text/plain`.
    PlainText,
    /// `text/markdown` and its aliases.
    Markdown,
    /// `application/pdf`.
    Pdf,
    /// Legacy binary word-processor format (`application/msword`).
    LegacyWord,
    /// Zip-based word-processor format (`.docx`).
    Docx,
}

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl MediaType {
    /// Recognize a declared MIME type, ignoring parameters such as `charset`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/plain" => Some(Self::PlainText),
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::LegacyWord),
            DOCX_MIME => Some(Self::Docx),
            _ => None,
        }
    }

    /// Recognize a file by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" | "text" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::LegacyWord),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Resolve the effective media type, preferring the declared type.
    ///
    /// The extension is consulted only when the declared type is blank or generic
    /// (`application/octet-stream`). A declared but unknown type is not second-guessed.
    pub fn resolve(declared: &str, path: &Path) -> Option<Self> {
        let trimmed = declared.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("application/octet-stream") {
            return Self::from_path(path);
        }
        Self::from_mime(trimmed)
    }

    /// Canonical MIME string.
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Pdf => "application/pdf",
            Self::LegacyWord => "application/msword",
            Self::Docx => DOCX_MIME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mime_ignores_parameters_and_case() {
        assert_eq!(
            MediaType::from_mime("Text/Plain; charset=utf-8"),
            Some(MediaType::PlainText)
        );
        assert_eq!(MediaType::from_mime(DOCX_MIME), Some(MediaType::Docx));
        assert_eq!(MediaType::from_mime("image/png"), None);
    }

    #[test]
    fn resolve_falls_back_to_extension_for_generic_types() {
        let path = Path::new("/uploads/report.PDF");
        assert_eq!(
            MediaType::resolve("application/octet-stream", path),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::resolve("", path), Some(MediaType::Pdf));
        assert_eq!(MediaType::resolve("image/png", path), None);
    }

    #[test]
    fn as_mime_round_trips_known_types() {
        for media in [
            MediaType::PlainText,
            MediaType::Markdown,
            MediaType::Pdf,
            MediaType::LegacyWord,
            MediaType::Docx,
        ] {
            assert_eq!(MediaType::from_mime(media.as_mime()), Some(media));
        }
    }
}
