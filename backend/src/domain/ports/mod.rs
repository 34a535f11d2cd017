//! Domain ports and supporting types for the hexagonal boundary.

mod creator_repository;
mod index_queue;
mod search_index;

#[cfg(test)]
pub use creator_repository::MockCreatorRepository;
pub use creator_repository::{
    CreatorRepository, CreatorRepositoryError, FixtureCreatorRepository,
};
#[cfg(test)]
pub use index_queue::MockIndexJobQueue;
pub use index_queue::{FixtureIndexQueue, IndexJob, IndexJobQueue, JobDispatchError};
#[cfg(test)]
pub use search_index::MockSearchIndex;
pub use search_index::{
    validate_pagination, FixtureSearchIndex, SearchIndex, SearchIndexError, SearchPage,
};
