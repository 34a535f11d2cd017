//! Port for scheduling background index-propagation jobs.
//!
//! The synchronization engine hands index work to this port fire-and-forget:
//! the request path never awaits index propagation, and a dispatch failure
//! only degrades index freshness.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of index-propagation work.
///
/// This is the internal queue protocol: serializable so a broker-backed
/// queue adapter can carry it over the wire unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexJob {
    /// Create the index if it does not exist.
    EnsureIndex {
        /// Target index name.
        index: String,
    },
    /// Upsert a full, prepared document.
    IndexDocument {
        /// Target index name.
        index: String,
        /// Document id (the record-store id in string form).
        doc_id: String,
        /// Prepared document, primary key already renamed.
        document: Value,
    },
    /// Merge a partial patch into an existing document.
    UpdateDocument {
        /// Target index name.
        index: String,
        /// Document id (the record-store id in string form).
        doc_id: String,
        /// Fields to merge, e.g. the `assets`-only patch.
        patch: Value,
    },
    /// Remove a document.
    DeleteDocument {
        /// Target index name.
        index: String,
        /// Document id (the record-store id in string form).
        doc_id: String,
    },
}

impl IndexJob {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnsureIndex { .. } => "ensure_index",
            Self::IndexDocument { .. } => "index_document",
            Self::UpdateDocument { .. } => "update_document",
            Self::DeleteDocument { .. } => "delete_document",
        }
    }
}

/// Errors raised when a job cannot be handed to the queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobDispatchError {
    /// The queue is no longer accepting jobs (worker pool shut down).
    #[error("index job queue closed: {message}")]
    QueueClosed { message: String },
}

impl JobDispatchError {
    /// Create a queue-closed error with the given message.
    pub fn queue_closed(message: impl Into<String>) -> Self {
        Self::QueueClosed {
            message: message.into(),
        }
    }
}

/// Port for the background task queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexJobQueue: Send + Sync {
    /// Enqueue one job for asynchronous execution.
    ///
    /// Returns as soon as the job is accepted; execution happens on the
    /// worker pool, at-least-once, relying on the search index adapter's own
    /// retry policy.
    async fn enqueue(&self, job: IndexJob) -> Result<(), JobDispatchError>;
}

/// Recording queue for tests: accepts every job and keeps it for assertions.
#[derive(Debug, Default)]
pub struct FixtureIndexQueue {
    jobs: Mutex<Vec<IndexJob>>,
}

impl FixtureIndexQueue {
    /// Create an empty recording queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs enqueued so far, in order.
    pub fn jobs(&self) -> Vec<IndexJob> {
        self.jobs.lock().expect("fixture queue lock").clone()
    }
}

#[async_trait]
impl IndexJobQueue for FixtureIndexQueue {
    async fn enqueue(&self, job: IndexJob) -> Result<(), JobDispatchError> {
        self.jobs.lock().expect("fixture queue lock").push(job);
        Ok(())
    }
}
