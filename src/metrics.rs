use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing document activity since startup.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_uploaded: AtomicU64,
    chunks_indexed: AtomicU64,
    queries_answered: AtomicU64,
    documents_deleted: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an uploaded document and the number of chunks indexed for it.
    pub fn record_upload(&self, chunk_count: u64) {
        self.documents_uploaded.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a question that produced an answer.
    pub fn record_query(&self) {
        self.queries_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deleted document.
    pub fn record_delete(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_uploaded: self.documents_uploaded.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            queries_answered: self.queries_answered.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents successfully uploaded and indexed.
    pub documents_uploaded: u64,
    /// Total chunks indexed across all uploads.
    pub chunks_indexed: u64,
    /// Questions answered.
    pub queries_answered: u64,
    /// Documents deleted.
    pub documents_deleted: u64,
}
