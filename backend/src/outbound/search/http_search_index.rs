//! Reqwest-backed search index adapter.
//!
//! This adapter owns transport details only: request construction, HTTP
//! error classification, and JSON decoding. It speaks the Elasticsearch
//! document API: `PUT /{index}` to create, `PUT /{index}/_doc/{id}` to
//! upsert, `POST /{index}/_update/{id}` to merge, `DELETE /{index}/_doc/{id}`
//! to remove, and `POST /{index}/_search` with a `query_string` query to
//! search. Every operation runs under the adapter's [`RetryPolicy`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use tracing::warn;

use super::dto::SearchResponseDto;
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::domain::ports::{validate_pagination, SearchIndex, SearchIndexError, SearchPage};

/// Marker the backend embeds in the body of a racing index creation.
const ALREADY_EXISTS_MARKER: &str = "resource_already_exists_exception";

/// Search index adapter performing HTTP requests against one endpoint.
pub struct HttpSearchIndex {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpSearchIndex {
    /// Build an adapter with the default retry policy and an explicit
    /// request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_policy(base_url, timeout, RetryPolicy::default(), Arc::new(TokioSleeper))
    }

    /// Build an adapter with an explicit retry policy and sleeper.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_policy(
        base_url: Url,
        timeout: Duration,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            retry,
            sleeper,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SearchIndexError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                SearchIndexError::invalid_request("search index URL cannot be a base")
            })?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn create_index_once(&self, url: Url) -> Result<(), SearchIndexError> {
        let head = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(map_transport_error)?;
        if head.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        match expect_success(response).await {
            Ok(_) => Ok(()),
            // Concurrent creators race to create the index; losing the race
            // is success.
            Err(SearchIndexError::AlreadyExists { message }) => {
                warn!(detail = message.as_str(), "index already exists, skipping");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<u8>, SearchIndexError> {
        let response = request.send().await.map_err(map_transport_error)?;
        expect_success(response).await
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn ensure_index(&self, index: &str) -> Result<(), SearchIndexError> {
        let url = self.endpoint(&[index])?;
        self.retry
            .run("ensure_index", &*self.sleeper, || {
                self.create_index_once(url.clone())
            })
            .await
    }

    async fn index_document(
        &self,
        index: &str,
        doc_id: &str,
        document: &Value,
    ) -> Result<(), SearchIndexError> {
        let url = self.endpoint(&[index, "_doc", doc_id])?;
        self.retry
            .run("index_document", &*self.sleeper, || {
                self.send_json(self.client.put(url.clone()).json(document))
            })
            .await
            .map(|_| ())
    }

    async fn update_document(
        &self,
        index: &str,
        doc_id: &str,
        patch: &Value,
    ) -> Result<(), SearchIndexError> {
        let url = self.endpoint(&[index, "_update", doc_id])?;
        let body = json!({ "doc": patch });
        self.retry
            .run("update_document", &*self.sleeper, || {
                self.send_json(self.client.post(url.clone()).json(&body))
            })
            .await
            .map(|_| ())
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_id: &str,
    ) -> Result<(), SearchIndexError> {
        let url = self.endpoint(&[index, "_doc", doc_id])?;
        self.retry
            .run("delete_document", &*self.sleeper, || {
                self.send_json(self.client.delete(url.clone()))
            })
            .await
            .map(|_| ())
    }

    async fn search(
        &self,
        index: &str,
        text: &str,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, SearchIndexError> {
        validate_pagination(page, per_page)?;

        let url = self.endpoint(&[index, "_search"])?;
        let body = build_search_body(text, page, per_page);
        let payload = self
            .retry
            .run("search", &*self.sleeper, || {
                self.send_json(self.client.post(url.clone()).json(&body))
            })
            .await?;

        let decoded: SearchResponseDto = serde_json::from_slice(&payload).map_err(|error| {
            SearchIndexError::decode(format!("invalid search response payload: {error}"))
        })?;
        Ok(decoded.into_page())
    }
}

/// Free-text query over all indexed fields with 1-based pagination.
fn build_search_body(text: &str, page: u32, per_page: u32) -> Value {
    let from = u64::from(page.saturating_sub(1)) * u64::from(per_page);
    json!({
        "query": { "bool": { "must": { "query_string": { "query": text } } } },
        "from": from,
        "size": per_page,
    })
}

async fn expect_success(response: reqwest::Response) -> Result<Vec<u8>, SearchIndexError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if status.is_success() {
        Ok(body.to_vec())
    } else {
        Err(map_status_error(status, body.as_ref()))
    }
}

fn map_transport_error(error: reqwest::Error) -> SearchIndexError {
    if error.is_timeout() {
        SearchIndexError::timeout(error.to_string())
    } else {
        SearchIndexError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> SearchIndexError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    if preview.contains(ALREADY_EXISTS_MARKER) {
        return SearchIndexError::already_exists(message);
    }

    match status {
        StatusCode::NOT_FOUND => SearchIndexError::not_found(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            SearchIndexError::timeout(message)
        }
        // Backend overload; worth another bounded attempt.
        StatusCode::TOO_MANY_REQUESTS => SearchIndexError::transport(message),
        _ if status.is_client_error() => SearchIndexError::invalid_request(message),
        _ => SearchIndexError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
