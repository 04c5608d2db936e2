//! Bounded buffer of documents awaiting submission.

use crate::search::{IndexDocument, MAX_BATCH_SIZE};

/// Accumulates documents until a batch is full.
#[derive(Debug)]
pub struct DocumentBatch {
    documents: Vec<IndexDocument>,
    capacity: usize,
}

impl DocumentBatch {
    /// Buffer holding up to [`MAX_BATCH_SIZE`] documents.
    pub fn new() -> Self {
        Self::with_capacity(MAX_BATCH_SIZE)
    }

    /// Buffer holding up to `capacity` documents, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BATCH_SIZE);
        Self {
            documents: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a document; returns `true` once the batch is full and must be flushed.
    pub fn push(&mut self, document: IndexDocument) -> bool {
        debug_assert!(self.documents.len() < self.capacity);
        self.documents.push(document);
        self.is_full()
    }

    /// Whether the buffer reached its capacity.
    pub fn is_full(&self) -> bool {
        self.documents.len() >= self.capacity
    }

    /// Number of buffered documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Move the buffered documents out, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<IndexDocument> {
        std::mem::replace(&mut self.documents, Vec::with_capacity(self.capacity))
    }
}

impl Default for DocumentBatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: usize) -> IndexDocument {
        IndexDocument {
            id: id.to_string(),
            content: String::new(),
            title: id.to_string(),
            language: "en".into(),
            entities: vec![],
            content_vector: vec![],
        }
    }

    #[test]
    fn reports_full_at_capacity() {
        let mut batch = DocumentBatch::with_capacity(2);
        assert!(!batch.push(document(1)));
        assert!(batch.push(document(2)));
        assert_eq!(batch.take().len(), 2);
        assert!(batch.is_empty());
    }

    #[test]
    fn capacity_never_exceeds_service_limit() {
        let mut batch = DocumentBatch::with_capacity(500);
        let mut pushes = 0;
        while !batch.push(document(pushes)) {
            pushes += 1;
        }
        assert_eq!(batch.len(), MAX_BATCH_SIZE);
        assert_eq!(DocumentBatch::with_capacity(0).capacity, 1);
    }
}
