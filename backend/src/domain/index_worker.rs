//! Execution of background index jobs against the search index port.
//!
//! Jobs arrive at-least-once and with no ordering guarantee beyond
//! FIFO-per-queue, so two jobs for the same document can apply out of causal
//! order. The runner makes the racy interleavings safe: an update against a
//! missing document is dropped rather than resurrecting it, and delete is
//! idempotent.

use std::sync::Arc;

use tracing::debug;

use crate::domain::ports::{IndexJob, SearchIndex, SearchIndexError};

/// Executes one [`IndexJob`] at a time against the search index.
///
/// Transient-fault retries live inside the search index adapter; by the time
/// an error reaches the runner it is final.
#[derive(Clone)]
pub struct IndexJobRunner {
    search_index: Arc<dyn SearchIndex>,
}

impl IndexJobRunner {
    /// Build a runner over the given search index.
    pub fn new(search_index: Arc<dyn SearchIndex>) -> Self {
        Self { search_index }
    }

    /// Execute one job to completion.
    ///
    /// Returns `Ok` for the tolerated races (update/delete against a missing
    /// document); any other error is final and left to the caller's failure
    /// handling.
    pub async fn run(&self, job: &IndexJob) -> Result<(), SearchIndexError> {
        match job {
            IndexJob::EnsureIndex { index } => self.search_index.ensure_index(index).await,
            IndexJob::IndexDocument {
                index,
                doc_id,
                document,
            } => {
                self.search_index
                    .index_document(index, doc_id, document)
                    .await
            }
            IndexJob::UpdateDocument {
                index,
                doc_id,
                patch,
            } => {
                match self.search_index.update_document(index, doc_id, patch).await {
                    // The document was deleted before this update applied.
                    // Dropping the patch keeps the delete authoritative.
                    Err(SearchIndexError::NotFound { message }) => {
                        debug!(
                            doc_id = doc_id.as_str(),
                            reason = message.as_str(),
                            "update dropped: document absent"
                        );
                        Ok(())
                    }
                    other => other,
                }
            }
            IndexJob::DeleteDocument { index, doc_id } => {
                match self.search_index.delete_document(index, doc_id).await {
                    // Deleting an already-absent document is success.
                    Err(SearchIndexError::NotFound { .. }) => Ok(()),
                    other => other,
                }
            }
        }
    }
}
