use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing one ingestion run.
#[derive(Default)]
pub struct IngestMetrics {
    blobs_seen: AtomicU64,
    blobs_skipped: AtomicU64,
    documents_indexed: AtomicU64,
    documents_failed: AtomicU64,
    batches_submitted: AtomicU64,
    batches_failed: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a listed blob.
    pub fn record_blob(&self) {
        self.blobs_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a blob dropped before it reached the index.
    pub fn record_skipped_blob(&self) {
        self.blobs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch the service answered, with its per-document outcome.
    pub fn record_batch(&self, indexed: u64, failed: u64) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.documents_indexed.fetch_add(indexed, Ordering::Relaxed);
        self.documents_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Record a batch whose submission failed outright.
    pub fn record_failed_batch(&self, documents: u64) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.documents_failed.fetch_add(documents, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> IngestReport {
        IngestReport {
            blobs_seen: self.blobs_seen.load(Ordering::Relaxed),
            blobs_skipped: self.blobs_skipped.load(Ordering::Relaxed),
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
    /// Blobs returned by the container listing.
    pub blobs_seen: u64,
    /// Blobs skipped because download, analysis, or embedding failed.
    pub blobs_skipped: u64,
    /// Documents the index accepted.
    pub documents_indexed: u64,
    /// Documents lost to failed or partially rejected batches.
    pub documents_failed: u64,
    /// Batches sent to the index.
    pub batches_submitted: u64,
    /// Batches whose submission failed outright.
    pub batches_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_batches_and_failures() {
        let metrics = IngestMetrics::new();
        metrics.record_blob();
        metrics.record_blob();
        metrics.record_skipped_blob();
        metrics.record_batch(3, 1);
        metrics.record_failed_batch(2);

        let report = metrics.snapshot();
        assert_eq!(report.blobs_seen, 2);
        assert_eq!(report.blobs_skipped, 1);
        assert_eq!(report.documents_indexed, 3);
        assert_eq!(report.documents_failed, 3);
        assert_eq!(report.batches_submitted, 2);
        assert_eq!(report.batches_failed, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(IngestMetrics::new().snapshot(), IngestReport::default());
    }
}
