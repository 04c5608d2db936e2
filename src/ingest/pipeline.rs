//! Sequential ingestion run over every blob in a container.

use super::{DocumentAnalyzer, DocumentBatch, DocumentIndex, document_key, is_valid_key};
use crate::analysis::{AnalysisClient, AnalysisError};
use crate::config::Config;
use crate::embedding::{EmbeddingClient, EmbeddingClientError, get_embedding_client};
use crate::metrics::{IngestMetrics, IngestReport};
use crate::search::{IndexDocument, SearchError, SearchService};
use crate::storage::{BlobContainer, BlobItem, StorageError};
use futures_util::{pin_mut, stream::StreamExt};
use thiserror::Error;

/// Errors raised while building the pipeline or processing a single blob.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A configuration section the pipeline needs was not loaded.
    #[error("Missing configuration section: {0}")]
    MissingConfig(&'static str),
    /// Blob listing or download failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Document analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// Embedding generation failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Search client could not be built.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// Blob name produced no usable document key.
    #[error("Blob name {0:?} cannot be used as a document key")]
    InvalidKey(String),
}

/// Owns the clients used by one ingestion run.
pub struct IngestionPipeline {
    container: BlobContainer,
    analyzer: Box<dyn DocumentAnalyzer>,
    embedder: Box<dyn EmbeddingClient>,
    index: Box<dyn DocumentIndex>,
    batch_capacity: usize,
    metrics: IngestMetrics,
}

impl IngestionPipeline {
    /// Assemble a pipeline from already-built components.
    pub fn new(
        container: BlobContainer,
        analyzer: Box<dyn DocumentAnalyzer>,
        embedder: Box<dyn EmbeddingClient>,
        index: Box<dyn DocumentIndex>,
    ) -> Self {
        Self {
            container,
            analyzer,
            embedder,
            index,
            batch_capacity: crate::search::MAX_BATCH_SIZE,
            metrics: IngestMetrics::new(),
        }
    }

    /// Use smaller batches than the service limit.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    /// Build every client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, IngestError> {
        let storage = config
            .storage
            .as_ref()
            .ok_or(IngestError::MissingConfig("storage"))?;
        let analysis = config
            .analysis
            .as_ref()
            .ok_or(IngestError::MissingConfig("analysis"))?;
        let search = config
            .search
            .as_ref()
            .ok_or(IngestError::MissingConfig("search"))?;

        tracing::info!("Initializing embedding client");
        let embedder = get_embedding_client(&config.embedding)?;
        tracing::info!(dimension = embedder.dimension(), "Embedding client initialized");

        Ok(Self::new(
            BlobContainer::from_config(storage)?,
            Box::new(AnalysisClient::new(analysis)?),
            embedder,
            Box::new(SearchService::new(search)?),
        ))
    }

    /// Process every blob in the container and submit the records in batches.
    ///
    /// Per-blob and per-batch failures are logged and counted; they never abort the run.
    pub async fn run(&self) -> IngestReport {
        tracing::info!(container = %self.container.name(), "Starting ingestion");
        let mut batch = DocumentBatch::with_capacity(self.batch_capacity);

        let blobs = self.container.list_blobs();
        pin_mut!(blobs);
        while let Some(item) = blobs.next().await {
            let blob = match item {
                Ok(blob) => blob,
                Err(error) => {
                    tracing::error!(
                        container = %self.container.name(),
                        error = %error,
                        "Blob listing failed; stopping"
                    );
                    break;
                }
            };
            self.metrics.record_blob();

            match self.process_blob(&blob).await {
                Ok(document) => {
                    if batch.push(document) {
                        self.flush(&mut batch).await;
                    }
                }
                Err(error) => {
                    self.metrics.record_skipped_blob();
                    tracing::error!(blob = %blob.name, error = %error, "Skipping blob");
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch).await;
        }

        let report = self.metrics.snapshot();
        tracing::info!(
            container = %self.container.name(),
            blobs = report.blobs_seen,
            skipped = report.blobs_skipped,
            indexed = report.documents_indexed,
            failed = report.documents_failed,
            batches = report.batches_submitted,
            failed_batches = report.batches_failed,
            "Ingestion finished"
        );
        report
    }

    /// Turn one blob into an index record.
    pub async fn process_blob(&self, blob: &BlobItem) -> Result<IndexDocument, IngestError> {
        let id = document_key(&blob.name);
        if !is_valid_key(&id) {
            return Err(IngestError::InvalidKey(blob.name.clone()));
        }

        let content = self.container.download(blob).await?;
        let analyzed = self.analyzer.analyze(content).await?;
        let content_vector = self.embedder.embed(&analyzed.content).await?;
        tracing::debug!(
            blob = %blob.name,
            id = %id,
            characters = analyzed.content.len(),
            language = %analyzed.language,
            entities = analyzed.entities.len(),
            "Blob analyzed"
        );

        Ok(IndexDocument {
            id,
            content: analyzed.content,
            title: blob.name.clone(),
            language: analyzed.language,
            entities: analyzed.entities,
            content_vector,
        })
    }

    async fn flush(&self, batch: &mut DocumentBatch) {
        // The buffer is emptied whether or not the upload succeeds.
        let documents = batch.take();
        let count = documents.len();

        match self.index.upload_documents(&documents).await {
            Ok(summary) => {
                self.metrics
                    .record_batch(summary.succeeded as u64, summary.failed_keys.len() as u64);
                if summary.failed_keys.is_empty() {
                    tracing::info!("Indexed {count} documents");
                } else {
                    tracing::warn!(
                        indexed = summary.succeeded,
                        failed_keys = ?summary.failed_keys,
                        "Index rejected part of the batch"
                    );
                }
            }
            Err(error) => {
                self.metrics.record_failed_batch(count as u64);
                tracing::error!(documents = count, error = %error, "Error indexing documents");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzedDocument;
    use crate::embedding::HashEmbeddingClient;
    use crate::search::{MAX_BATCH_SIZE, UploadSummary};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream::{self, BoxStream};
    use object_store::{
        GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
        PutMultipartOpts, PutOptions, PutPayload, PutResult, memory::InMemory, path::Path,
    };
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};

    struct EchoAnalyzer;

    #[async_trait]
    impl DocumentAnalyzer for EchoAnalyzer {
        async fn analyze(&self, content: Bytes) -> Result<AnalyzedDocument, AnalysisError> {
            let text = String::from_utf8_lossy(&content).to_string();
            if text == "corrupt" {
                return Err(AnalysisError::Failed("InvalidContent: corrupt".into()));
            }
            Ok(AnalyzedDocument {
                content: text,
                language: "en".into(),
                entities: vec!["Contoso".into()],
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingIndex {
        batches: Arc<Mutex<Vec<Vec<IndexDocument>>>>,
        fail_batches: Arc<Mutex<Vec<usize>>>,
    }

    impl RecordingIndex {
        fn failing_on(batch_numbers: Vec<usize>) -> Self {
            Self {
                fail_batches: Arc::new(Mutex::new(batch_numbers)),
                ..Self::default()
            }
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }
    }

    #[async_trait]
    impl DocumentIndex for RecordingIndex {
        async fn upload_documents(
            &self,
            documents: &[IndexDocument],
        ) -> Result<UploadSummary, SearchError> {
            let mut batches = self.batches.lock().unwrap();
            batches.push(documents.to_vec());
            if self.fail_batches.lock().unwrap().contains(&batches.len()) {
                return Err(SearchError::UnexpectedStatus {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "busy".into(),
                });
            }
            Ok(UploadSummary {
                succeeded: documents.len(),
                failed_keys: vec![],
            })
        }
    }

    /// Store whose listing fails after yielding every stored object.
    #[derive(Debug, Default)]
    struct InterruptedListing {
        inner: InMemory,
    }

    impl std::fmt::Display for InterruptedListing {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "InterruptedListing")
        }
    }

    #[async_trait]
    impl ObjectStore for InterruptedListing {
        async fn put_opts(
            &self,
            location: &Path,
            payload: PutPayload,
            opts: PutOptions,
        ) -> object_store::Result<PutResult> {
            self.inner.put_opts(location, payload, opts).await
        }

        async fn put_multipart_opts(
            &self,
            location: &Path,
            opts: PutMultipartOpts,
        ) -> object_store::Result<Box<dyn MultipartUpload>> {
            self.inner.put_multipart_opts(location, opts).await
        }

        async fn get_opts(
            &self,
            location: &Path,
            options: GetOptions,
        ) -> object_store::Result<GetResult> {
            self.inner.get_opts(location, options).await
        }

        async fn delete(&self, location: &Path) -> object_store::Result<()> {
            self.inner.delete(location).await
        }

        fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
            let failure = stream::once(async {
                Err(object_store::Error::Generic {
                    store: "InterruptedListing",
                    source: "connection reset during listing".into(),
                })
            });
            self.inner.list(prefix).chain(failure).boxed()
        }

        async fn list_with_delimiter(
            &self,
            prefix: Option<&Path>,
        ) -> object_store::Result<ListResult> {
            self.inner.list_with_delimiter(prefix).await
        }

        async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
            self.inner.copy(from, to).await
        }

        async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
            self.inner.copy_if_not_exists(from, to).await
        }
    }

    async fn container_with(blobs: &[(String, &'static [u8])]) -> BlobContainer {
        let store = Arc::new(InMemory::new());
        for (name, body) in blobs {
            store
                .put(&Path::from(name.as_str()), PutPayload::from_static(*body))
                .await
                .unwrap();
        }
        BlobContainer::new(store, "docs")
    }

    fn pipeline(container: BlobContainer, index: RecordingIndex) -> IngestionPipeline {
        IngestionPipeline::new(
            container,
            Box::new(EchoAnalyzer),
            Box::new(HashEmbeddingClient::new(8)),
            Box::new(index),
        )
    }

    #[tokio::test]
    async fn batches_never_exceed_the_limit() {
        let blobs: Vec<_> = (0..120)
            .map(|idx| (format!("doc-{idx:03}"), b"body".as_slice()))
            .collect();
        let index = RecordingIndex::default();
        let report = pipeline(container_with(&blobs).await, index.clone())
            .run()
            .await;

        assert_eq!(index.batch_sizes(), vec![50, 50, 20]);
        assert!(index.batch_sizes().iter().all(|size| *size <= MAX_BATCH_SIZE));
        assert_eq!(report.blobs_seen, 120);
        assert_eq!(report.documents_indexed, 120);
        assert_eq!(report.batches_submitted, 3);
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_later_batches() {
        let blobs: Vec<_> = (0..7)
            .map(|idx| (format!("doc-{idx}"), b"body".as_slice()))
            .collect();
        let index = RecordingIndex::failing_on(vec![1]);
        let report = pipeline(container_with(&blobs).await, index.clone())
            .with_batch_capacity(3)
            .run()
            .await;

        assert_eq!(index.batch_sizes(), vec![3, 3, 1]);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.documents_failed, 3);
        assert_eq!(report.documents_indexed, 4);
    }

    #[tokio::test]
    async fn unreadable_blob_is_skipped() {
        let blobs = vec![
            ("good.pdf".to_string(), b"fine".as_slice()),
            ("bad.pdf".to_string(), b"corrupt".as_slice()),
        ];
        let index = RecordingIndex::default();
        let report = pipeline(container_with(&blobs).await, index.clone())
            .run()
            .await;

        assert_eq!(report.blobs_skipped, 1);
        let batches = index.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let document = &batches[0][0];
        assert_eq!(document.title, "good.pdf");
        assert_eq!(document.id, document_key("good.pdf"));
        assert_eq!(document.content, "fine");
        assert_eq!(document.entities, vec!["Contoso".to_string()]);
        assert_eq!(document.content_vector.len(), 8);
    }

    #[tokio::test]
    async fn empty_container_submits_nothing() {
        let index = RecordingIndex::default();
        let report = pipeline(container_with(&[]).await, index.clone()).run().await;
        assert!(index.batch_sizes().is_empty());
        assert_eq!(report, IngestReport::default());
    }

    #[tokio::test]
    async fn listing_failure_still_flushes_collected_documents() {
        let store = Arc::new(InterruptedListing::default());
        for name in ["first.pdf", "second.pdf"] {
            store
                .put(&Path::from(name), PutPayload::from_static(b"body"))
                .await
                .unwrap();
        }
        let index = RecordingIndex::default();
        let report = pipeline(BlobContainer::new(store, "docs"), index.clone())
            .run()
            .await;

        assert_eq!(index.batch_sizes(), vec![2]);
        let titles: Vec<String> = index.batches.lock().unwrap()[0]
            .iter()
            .map(|document| document.title.clone())
            .collect();
        assert_eq!(titles, vec!["first.pdf".to_string(), "second.pdf".to_string()]);
        assert_eq!(report.blobs_seen, 2);
        assert_eq!(report.documents_indexed, 2);
    }
}
