//! File records consumed from the external file collaborator.
//!
//! The pipeline only reads [`FileRecord`] fields. It calls [`FileRegistry::remove`] in two places:
//! rolling back a failed ingestion, and the combined "delete file and its chunks" operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by a file registry backend.
#[derive(Debug, Error)]
pub enum FileRegistryError {
    /// Backend could not be reached or rejected the request.
    #[error("File registry unavailable: {0}")]
    Unavailable(String),
    /// A record with the same identifier is already registered.
    #[error("File already registered: {0}")]
    AlreadyRegistered(String),
}

/// Uploaded file as described by the file collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Identifier owned by the file collaborator.
    pub file_id: String,
    /// Original file name shown to users.
    pub filename: String,
    /// Declared media type.
    pub media_type: String,
    /// Size of the stored bytes.
    pub byte_size: u64,
    /// Location of the stored bytes on local disk.
    pub stored_path: PathBuf,
    /// Already-authorized identity of the uploader.
    pub uploaded_by: String,
}

/// Storage of file records, implemented outside the core.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    /// Record a newly uploaded file. Registering an identifier twice fails with
    /// [`FileRegistryError::AlreadyRegistered`].
    async fn register(&self, file: FileRecord) -> Result<(), FileRegistryError>;

    /// Look up a file record by identifier.
    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, FileRegistryError>;

    /// Remove a file record, returning whether it existed.
    async fn remove(&self, file_id: &str) -> Result<bool, FileRegistryError>;
}

/// Process-local registry used by the binary and tests.
#[derive(Default)]
pub struct InMemoryFileRegistry {
    files: RwLock<HashMap<String, FileRecord>>,
}

impl InMemoryFileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered files.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Whether no file is registered.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl FileRegistry for InMemoryFileRegistry {
    async fn register(&self, file: FileRecord) -> Result<(), FileRegistryError> {
        let mut files = self.files.write().await;
        if files.contains_key(&file.file_id) {
            return Err(FileRegistryError::AlreadyRegistered(file.file_id));
        }
        files.insert(file.file_id.clone(), file);
        Ok(())
    }

    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, FileRegistryError> {
        Ok(self.files.read().await.get(file_id).cloned())
    }

    async fn remove(&self, file_id: &str) -> Result<bool, FileRegistryError> {
        Ok(self.files.write().await.remove(file_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_id: &str) -> FileRecord {
        FileRecord {
            file_id: file_id.into(),
            filename: "notes.txt".into(),
            media_type: "text/plain".into(),
            byte_size: 12,
            stored_path: PathBuf::from("/tmp/notes.txt"),
            uploaded_by: "admin@example.org".into(),
        }
    }

    #[tokio::test]
    async fn register_get_and_remove() {
        let registry = InMemoryFileRegistry::new();
        registry.register(record("f-1")).await.unwrap();
        assert_eq!(registry.len().await, 1);

        let found = registry.get("f-1").await.unwrap().expect("registered");
        assert_eq!(found.filename, "notes.txt");

        assert!(registry.remove("f-1").await.unwrap());
        assert!(!registry.remove("f-1").await.unwrap());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_identifier_keeps_the_first_record() {
        let registry = InMemoryFileRegistry::new();
        registry.register(record("f-1")).await.unwrap();

        let mut other = record("f-1");
        other.filename = "other.txt".into();
        let error = registry.register(other).await.unwrap_err();

        assert!(matches!(error, FileRegistryError::AlreadyRegistered(id) if id == "f-1"));
        let kept = registry.get("f-1").await.unwrap().expect("registered");
        assert_eq!(kept.filename, "notes.txt");
    }

    #[test]
    fn file_record_uses_camel_case_wire_names() {
        let json = serde_json::to_value(record("f-2")).unwrap();
        assert_eq!(json["fileId"], "f-2");
        assert_eq!(json["mediaType"], "text/plain");
        assert_eq!(json["uploadedBy"], "admin@example.org");
    }
}
