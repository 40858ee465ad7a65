//! Startup ingestion of every supported file under a directory.

use std::path::Path;

use walkdir::WalkDir;

use crate::extraction::MediaType;
use crate::files::FileRecord;
use crate::processing::RagApi;

/// Uploader identity recorded on preloaded files.
pub const PRELOAD_UPLOADER: &str = "system";

/// Counters reported after a preload run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadSummary {
    /// Files ingested successfully.
    pub ingested: usize,
    /// Supported files whose ingestion failed.
    pub failed: usize,
    /// Files skipped because their extension is not supported.
    pub skipped: usize,
}

/// Ingest every supported file under `root`, in path order.
///
/// Failures are logged and counted; they never abort the walk.
pub async fn preload_directory<S>(service: &S, root: &Path) -> PreloadSummary
where
    S: RagApi + ?Sized,
{
    let mut summary = PreloadSummary::default();
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file());

    for entry in entries {
        let path = entry.path();
        let Some(media) = MediaType::from_path(path) else {
            tracing::debug!(path = %path.display(), "Skipping unsupported file");
            summary.skipped += 1;
            continue;
        };
        let byte_size = entry.metadata().map(|meta| meta.len()).unwrap_or_default();
        let record = FileRecord {
            file_id: uuid::Uuid::new_v4().to_string(),
            filename: entry.file_name().to_string_lossy().into_owned(),
            media_type: media.as_mime().to_string(),
            byte_size,
            stored_path: path.to_path_buf(),
            uploaded_by: PRELOAD_UPLOADER.to_string(),
        };

        match service.upload(record).await {
            Ok(outcome) => {
                summary.ingested += 1;
                tracing::debug!(path = %path.display(), chunks = outcome.chunk_count(), "Preloaded file");
            }
            Err(error) => {
                summary.failed += 1;
                tracing::warn!(path = %path.display(), %error, "Failed to preload file");
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        ingested = summary.ingested,
        failed = summary.failed,
        skipped = summary.skipped,
        "Preload finished"
    );
    summary
}
