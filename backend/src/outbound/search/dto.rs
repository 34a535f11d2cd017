//! Wire DTOs for the Elasticsearch-compatible search API.
//!
//! These types mirror just the slice of the response the domain consumes and
//! must never leak past the adapter.

use serde::Deserialize;

use crate::domain::ports::SearchPage;

/// Top-level search response.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponseDto {
    hits: HitsDto,
}

#[derive(Debug, Deserialize)]
struct HitsDto {
    total: TotalDto,
    hits: Vec<HitDto>,
}

#[derive(Debug, Deserialize)]
struct TotalDto {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct HitDto {
    #[serde(rename = "_id")]
    id: String,
}

impl SearchResponseDto {
    /// Flatten the response into the port's page shape, hits in rank order.
    pub(crate) fn into_page(self) -> SearchPage {
        SearchPage {
            total: self.hits.total.value,
            doc_ids: self.hits.hits.into_iter().map(|hit| hit.id).collect(),
        }
    }
}
