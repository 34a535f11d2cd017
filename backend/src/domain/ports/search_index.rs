//! Port for the eventually-consistent search index.
//!
//! The index holds a denormalized copy of creator documents, derived from the
//! record store. Adapters own their retry policy; callers see either success
//! or a final, classified error.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

/// Errors raised by search index adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchIndexError {
    /// Connectivity failure talking to the index backend.
    #[error("search index transport failed: {message}")]
    Transport { message: String },

    /// The index backend did not answer within the request timeout.
    #[error("search index timed out: {message}")]
    Timeout { message: String },

    /// The resource being created already exists.
    #[error("search index resource already exists: {message}")]
    AlreadyExists { message: String },

    /// The addressed document or index does not exist.
    #[error("search index resource not found: {message}")]
    NotFound { message: String },

    /// The request was rejected as invalid by the backend or by validation.
    #[error("{message}")]
    InvalidRequest { message: String },

    /// The backend answered with a payload we could not decode.
    #[error("search index response could not be decoded: {message}")]
    Decode { message: String },
}

impl SearchIndexError {
    /// Create a transport error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a timeout error with the given message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create an already-exists error with the given message.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create a not-found error with the given message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an invalid-request error with the given message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a decode error with the given message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether a bounded retry may succeed.
    ///
    /// Only connectivity failures are retryable; request-validity failures
    /// such as "already exists" never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// One page of search hits: the total hit count plus the document ids on this
/// page, in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    /// Total matching documents across all pages.
    pub total: u64,
    /// Document ids on this page, most relevant first.
    pub doc_ids: Vec<String>,
}

/// Reject pagination values the backend would misinterpret.
///
/// Pages are 1-based. This runs before any request is issued, so invalid
/// input never reaches the index backend. Every [`SearchIndex`]
/// implementation calls it at the top of `search`.
pub fn validate_pagination(page: u32, per_page: u32) -> Result<(), SearchIndexError> {
    if page < 1 {
        return Err(SearchIndexError::invalid_request(
            "Page must be greater than or equal to 1.",
        ));
    }
    if per_page < 1 {
        return Err(SearchIndexError::invalid_request(
            "Per page must be greater than or equal to 1.",
        ));
    }
    Ok(())
}

/// Port for the denormalized, eventually-consistent search index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index if it does not exist.
    ///
    /// Idempotent: an index that already exists — including one created by a
    /// concurrent racer — is success, not an error.
    async fn ensure_index(&self, index: &str) -> Result<(), SearchIndexError>;

    /// Upsert a document keyed by `doc_id`.
    ///
    /// The document has already been prepared for indexing: the store
    /// primary-key field travels under the neutral
    /// [`crate::domain::RECORD_ID_FIELD`] name.
    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Merge `patch` into an existing document.
    ///
    /// Fails with [`SearchIndexError::NotFound`] when the document is absent;
    /// it is never created from a partial patch.
    async fn update_document(
        &self,
        index: &str,
        doc_id: &str,
        patch: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Remove a document.
    ///
    /// Absence surfaces [`SearchIndexError::NotFound`]; background callers
    /// treat that as success.
    async fn delete_document(&self, index: &str, doc_id: &str)
        -> Result<(), SearchIndexError>;

    /// Free-text query over all indexed fields, with 1-based pagination.
    async fn search(
        &self,
        index: &str,
        text: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, SearchIndexError>;
}

/// In-memory index for tests and fixture wiring.
///
/// Matching is naive substring search over every string value in the
/// document, which is close enough to "free-text query over all indexed
/// fields" for exercising the synchronization engine.
#[derive(Debug, Default)]
pub struct FixtureSearchIndex {
    indices: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl FixtureSearchIndex {
    /// Create a fixture with no indices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored document, for assertions.
    pub fn document(&self, index: &str, doc_id: &str) -> Option<Value> {
        self.indices
            .lock()
            .expect("fixture index lock")
            .get(index)
            .and_then(|docs| docs.get(doc_id))
            .cloned()
    }

    /// Whether the named index has been created.
    pub fn has_index(&self, index: &str) -> bool {
        self.indices
            .lock()
            .expect("fixture index lock")
            .contains_key(index)
    }

    fn document_matches(document: &Value, text: &str) -> bool {
        match document {
            Value::String(value) => value.contains(text),
            Value::Array(items) => items.iter().any(|item| Self::document_matches(item, text)),
            Value::Object(fields) => fields
                .values()
                .any(|value| Self::document_matches(value, text)),
            _ => false,
        }
    }
}

#[async_trait]
impl SearchIndex for FixtureSearchIndex {
    async fn ensure_index(&self, index: &str) -> Result<(), SearchIndexError> {
        self.indices
            .lock()
            .expect("fixture index lock")
            .entry(index.to_owned())
            .or_default();
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        self.indices
            .lock()
            .expect("fixture index lock")
            .entry(index.to_owned())
            .or_default()
            .insert(doc_id.to_owned(), document.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        index: &str,
        doc_id: &str,
        patch: &Value,
    ) -> Result<(), SearchIndexError> {
        let mut indices = self.indices.lock().expect("fixture index lock");
        let document = indices
            .get_mut(index)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| {
                SearchIndexError::not_found(format!("document {doc_id} absent from {index}"))
            })?;

        match (document.as_object_mut(), patch.as_object()) {
            (Some(fields), Some(changes)) => {
                for (key, value) in changes {
                    fields.insert(key.clone(), value.clone());
                }
                Ok(())
            }
            _ => Err(SearchIndexError::invalid_request(
                "partial updates require object documents",
            )),
        }
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_id: &str,
    ) -> Result<(), SearchIndexError> {
        self.indices
            .lock()
            .expect("fixture index lock")
            .get_mut(index)
            .and_then(|docs| docs.remove(doc_id))
            .map(|_| ())
            .ok_or_else(|| {
                SearchIndexError::not_found(format!("document {doc_id} absent from {index}"))
            })
    }

    async fn search(
        &self,
        index: &str,
        text: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, SearchIndexError> {
        validate_pagination(page, per_page)?;

        let indices = self.indices.lock().expect("fixture index lock");
        let matches: Vec<String> = indices
            .get(index)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, document)| Self::document_matches(document, text))
                    .map(|(doc_id, _)| doc_id.clone())
                    .collect()
            })
            .unwrap_or_default();

        let total = matches.len() as u64;
        let offset = (page as usize - 1).saturating_mul(per_page as usize);
        let doc_ids = matches
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Ok(SearchPage { total, doc_ids })
    }
}
