//! HTTP surface for the document pipeline.
//!
//! This module exposes a compact Axum router over [`RagApi`]:
//!
//! - `POST /files` – Register an uploaded file and ingest it. Returns the file and its chunk count.
//! - `DELETE /files/:file_id` – Delete a file record together with its chunks.
//! - `DELETE /files/:file_id/chunks` – Delete the chunks of a file, keeping the record.
//! - `GET /files/:file_id/chunks?page&limit` – Page through a file's chunks by index.
//! - `GET /search?query&limit` – Rank chunks against a free-text query.
//! - `POST /ask` – Answer a question from the best matching chunks.
//! - `GET /documents` – List files that own chunks.
//! - `GET /documents/:file_name/preview?limit` – Leading chunks stored under a file name.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Transport concerns (multipart upload, authentication, size ceilings) live in front of this
//! router; handlers receive already-stored files and already-authorized identities.

use crate::files::{FileRecord, FileRegistryError};
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    AnswerError, AnswerOutcome, ChunkPage, DocumentList, DocumentPreview, ProcessingError, RagApi,
    SearchError, SearchResults,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the pipeline operations.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RagApi + 'static,
{
    Router::new()
        .route("/files", post(upload_file::<S>))
        .route("/files/:file_id", delete(delete_file::<S>))
        .route(
            "/files/:file_id/chunks",
            get(list_chunks::<S>).delete(delete_file_chunks::<S>),
        )
        .route("/search", get(search::<S>))
        .route("/ask", post(ask::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/documents/:file_name/preview", get(preview_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Success response for `POST /files`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file: FileRecord,
    chunk_count: usize,
}

/// Register and ingest an uploaded file.
async fn upload_file<S>(
    State(service): State<Arc<S>>,
    Json(file): Json<FileRecord>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError>
where
    S: RagApi,
{
    let outcome = service.upload(file.clone()).await?;
    tracing::info!(
        file_id = %file.file_id,
        chunks = outcome.chunk_count(),
        "Upload request completed"
    );
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            file,
            chunk_count: outcome.chunk_count(),
        }),
    ))
}

/// Response body for both delete endpoints.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    file_id: String,
    deleted_count: usize,
}

async fn delete_file<S>(
    State(service): State<Arc<S>>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: RagApi,
{
    let deleted_count = service.delete_file(&file_id).await?;
    Ok(Json(DeleteResponse {
        file_id,
        deleted_count,
    }))
}

async fn delete_file_chunks<S>(
    State(service): State<Arc<S>>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: RagApi,
{
    let deleted_count = service.delete_file_chunks(&file_id).await?;
    Ok(Json(DeleteResponse {
        file_id,
        deleted_count,
    }))
}

/// Query string for `GET /files/:file_id/chunks`.
#[derive(Deserialize)]
struct ChunkListParams {
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    limit: Option<i64>,
}

async fn list_chunks<S>(
    State(service): State<Arc<S>>,
    Path(file_id): Path<String>,
    Query(params): Query<ChunkListParams>,
) -> Result<Json<ChunkPage>, AppError>
where
    S: RagApi,
{
    let page = service
        .list_chunks(&file_id, params.page, params.limit)
        .await?;
    Ok(Json(page))
}

/// Query string for `GET /search`.
#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<i64>,
}

async fn search<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError>
where
    S: RagApi,
{
    let results = service.search(&params.query, params.limit).await?;
    Ok(Json(results))
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    max_chunks: Option<i64>,
}

async fn ask<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerOutcome>, AppError>
where
    S: RagApi,
{
    let outcome = service
        .answer_question(&request.question, request.max_chunks)
        .await?;
    Ok(Json(outcome))
}

async fn list_documents<S>(State(service): State<Arc<S>>) -> Result<Json<DocumentList>, AppError>
where
    S: RagApi,
{
    Ok(Json(service.list_documents().await?))
}

/// Query string for `GET /documents/:file_name/preview`.
#[derive(Deserialize)]
struct PreviewParams {
    #[serde(default)]
    limit: Option<i64>,
}

async fn preview_document<S>(
    State(service): State<Arc<S>>,
    Path(file_name): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<DocumentPreview>, AppError>
where
    S: RagApi,
{
    let preview = service.preview_document(&file_name, params.limit).await?;
    Ok(Json(preview))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: RagApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/files",
                description: "Register a stored file and ingest it: extract text, split it into overlapping chunks, and index them. Response returns { \"file\": object, \"chunkCount\": number }.",
                request_example: Some(json!({
                    "fileId": "3f2a9c",
                    "filename": "refund-policy.pdf",
                    "mediaType": "application/pdf",
                    "byteSize": 52_311,
                    "storedPath": "/var/uploads/3f2a9c.pdf",
                    "uploadedBy": "admin@example.org"
                })),
            },
            CommandDescriptor {
                name: "delete_file",
                method: "DELETE",
                path: "/files/:file_id",
                description: "Delete a file record together with all of its chunks.",
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_file_chunks",
                method: "DELETE",
                path: "/files/:file_id/chunks",
                description: "Delete every chunk of a file. Repeated calls return a deletedCount of 0.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_chunks",
                method: "GET",
                path: "/files/:file_id/chunks?page=1&limit=10",
                description: "Page through a file's chunks ordered by chunk index.",
                request_example: None,
            },
            CommandDescriptor {
                name: "search",
                method: "GET",
                path: "/search?query=refund&limit=10",
                description: "Full-text search over chunk content, best match first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a question from the best matching chunks and cite them as sources.",
                request_example: Some(json!({
                    "question": "How long do refunds take?",
                    "maxChunks": 5
                })),
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "List files that own chunks, most recently updated first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "preview_document",
                method: "GET",
                path: "/documents/:file_name/preview?limit=3",
                description: "Show excerpts of the leading chunks stored under a file name.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion and retrieval counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Processing(ProcessingError),
    Search(SearchError),
    Answer(AnswerError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Search(SearchError::QueryRequired)
            | Self::Answer(AnswerError::QuestionRequired) => StatusCode::BAD_REQUEST,
            Self::Processing(ProcessingError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Processing(ProcessingError::UnsupportedFormat(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::Processing(ProcessingError::EmptyDocument(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Processing(ProcessingError::FileRegistry(FileRegistryError::AlreadyRegistered(
                _,
            ))) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Processing(error) => error.to_string(),
            Self::Search(error) => error.to_string(),
            Self::Answer(error) => error.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::warn!(%status, error = %message, "Request failed");
        }
        let error = status.canonical_reason().unwrap_or("Error");
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}

impl From<AnswerError> for AppError {
    fn from(inner: AnswerError) -> Self {
        Self::Answer(inner)
    }
}
