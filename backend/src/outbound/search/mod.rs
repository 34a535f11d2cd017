//! Search index adapter: reqwest transport plus explicit retry policy.

mod dto;
mod http_search_index;
mod retry;

pub use http_search_index::HttpSearchIndex;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
