//! Text extraction for zip-based word-processor documents.
//!
//! The body lives in `word/document.xml`. Text runs (`w:t`) are concatenated, paragraphs end
//! with a line break, and tab/break elements map to their whitespace equivalents.

use std::io::{Cursor, Read};

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the plain text body of a `.docx` archive.
pub(crate) fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::Failed(format!("invalid docx archive: {error}")))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| ExtractionError::Failed(format!("missing {DOCUMENT_PART}: {error}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|error| ExtractionError::Failed(format!("unreadable {DOCUMENT_PART}: {error}")))?;
    Ok(document_xml_to_text(&xml))
}

#[derive(Debug, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Empty,
}

fn parse_tag(raw: &str) -> (&str, TagKind) {
    if let Some(rest) = raw.strip_prefix('/') {
        return (tag_name(rest), TagKind::Close);
    }
    if let Some(rest) = raw.strip_suffix('/') {
        return (tag_name(rest), TagKind::Empty);
    }
    (tag_name(raw), TagKind::Open)
}

fn tag_name(raw: &str) -> &str {
    raw.split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default()
}

/// Flatten WordprocessingML into plain text.
pub(crate) fn document_xml_to_text(xml: &str) -> String {
    let mut output = String::new();
    let mut rest = xml;
    let mut in_text_run = false;
    let mut in_paragraph_properties = false;

    while let Some(open) = rest.find('<') {
        if in_text_run {
            output.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let raw = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        if raw.starts_with('?') || raw.starts_with('!') {
            continue;
        }

        match parse_tag(raw) {
            ("w:t", TagKind::Open) => in_text_run = true,
            ("w:t", _) => in_text_run = false,
            ("w:pPr", TagKind::Open) => in_paragraph_properties = true,
            ("w:pPr", TagKind::Close) => in_paragraph_properties = false,
            ("w:p", TagKind::Close) => output.push('\n'),
            ("w:tab", TagKind::Empty) if !in_paragraph_properties => output.push('\t'),
            ("w:br" | "w:cr", TagKind::Empty) => output.push('\n'),
            _ => {}
        }
    }

    output
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            decoded.push_str(tail);
            return decoded;
        };
        let entity = &tail[1..semi];
        match decode_entity(entity) {
            Some(ch) => decoded.push(ch),
            None => decoded.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    decoded.push_str(rest);
    decoded
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
