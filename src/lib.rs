#![deny(missing_docs)]

//! Core library for docsearch: blob ingestion into a managed search index and a small query
//! front end.

/// Document-analysis service client.
pub mod analysis;
/// HTTP routing for the query service.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// URL helpers shared by REST clients.
pub mod endpoint;
/// Blob-to-index ingestion pipeline.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion counters.
pub mod metrics;
/// Index schema provisioning.
pub mod provision;
/// Query dispatch and development mode.
pub mod query;
/// Managed search service integration.
pub mod search;
/// Source blob container access.
pub mod storage;
