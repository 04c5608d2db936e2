//! Blob-to-index ingestion: analysis, embedding, and batched submission.

mod batch;
mod key;
mod pipeline;

pub use batch::DocumentBatch;
pub use key::{document_key, is_valid_key};
pub use pipeline::{IngestError, IngestionPipeline};

use crate::analysis::{AnalysisClient, AnalysisError, AnalyzedDocument};
use crate::search::{IndexDocument, SearchError, SearchService, UploadSummary};
use async_trait::async_trait;
use bytes::Bytes;

/// Extracts text, language and entities from raw document bytes.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze one document, waiting until the result is available.
    async fn analyze(&self, content: Bytes) -> Result<AnalyzedDocument, AnalysisError>;
}

/// Destination accepting batches of document records.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// Insert or overwrite `documents` in one call.
    async fn upload_documents(
        &self,
        documents: &[IndexDocument],
    ) -> Result<UploadSummary, SearchError>;
}

#[async_trait]
impl DocumentAnalyzer for AnalysisClient {
    async fn analyze(&self, content: Bytes) -> Result<AnalyzedDocument, AnalysisError> {
        AnalysisClient::analyze(self, content).await
    }
}

#[async_trait]
impl DocumentIndex for SearchService {
    async fn upload_documents(
        &self,
        documents: &[IndexDocument],
    ) -> Result<UploadSummary, SearchError> {
        SearchService::upload_documents(self, documents).await
    }
}
