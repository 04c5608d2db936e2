//! Managed search service integration.

pub mod client;
/// Streaming helpers for paged query results.
pub mod results;
pub mod schema;
pub mod types;

pub use client::SearchService;
pub use results::{query_body, stream_hits};
pub use schema::IndexSchema;
pub use types::{
    IndexDocument, MAX_BATCH_SIZE, QueryKind, SearchError, SearchHit, UploadSummary,
};
