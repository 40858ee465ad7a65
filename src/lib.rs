#![deny(missing_docs)]

//! Core library for the docrag document ingestion and retrieval service.

/// Answering providers that turn retrieved context into answer text.
pub mod answering;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from stored documents.
pub mod extraction;
/// File records owned by the external file collaborator.
pub mod files;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Startup ingestion of a local directory.
pub mod preload;
/// Ingestion and retrieval pipeline.
pub mod processing;
/// Chunk persistence and full-text ranking.
pub mod store;
