//! Creator service: the synchronization engine and query façade.
//!
//! Every mutation lands in the record store synchronously, so reads
//! immediately after a write observe it; the search index is brought into
//! agreement asynchronously through the background job queue. The request
//! path never awaits index propagation — availability and latency of the
//! write path are traded for read-your-writes consistency in the index.

use std::sync::Arc;

use mockable::Clock;
use tracing::warn;

use crate::domain::ports::{
    CreatorRepository, CreatorRepositoryError, IndexJob, IndexJobQueue, SearchIndex,
    SearchIndexError,
};
use crate::domain::{assets_patch, Asset, Creator, CreatorId, Error};

/// Default name of the search index holding creator documents.
pub const CREATOR_INDEX: &str = "creators";

/// Service implementing the creator façade over the domain ports.
pub struct CreatorService {
    repository: Arc<dyn CreatorRepository>,
    search_index: Arc<dyn SearchIndex>,
    queue: Arc<dyn IndexJobQueue>,
    clock: Arc<dyn Clock>,
    index_name: String,
}

impl CreatorService {
    /// Build a service over the given ports, indexing into [`CREATOR_INDEX`].
    pub fn new(
        repository: Arc<dyn CreatorRepository>,
        search_index: Arc<dyn SearchIndex>,
        queue: Arc<dyn IndexJobQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_index_name(repository, search_index, queue, clock, CREATOR_INDEX)
    }

    /// Build a service indexing into an explicitly named index.
    pub fn with_index_name(
        repository: Arc<dyn CreatorRepository>,
        search_index: Arc<dyn SearchIndex>,
        queue: Arc<dyn IndexJobQueue>,
        clock: Arc<dyn Clock>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            search_index,
            queue,
            clock,
            index_name: index_name.into(),
        }
    }

    /// Create a creator and schedule its indexing.
    ///
    /// The existence pre-check and the insert are not atomic; the store's
    /// unique email index is the backstop, surfacing as the same
    /// `AlreadyExists` error when a concurrent create wins the race.
    pub async fn add_creator(&self, username: &str, email: &str) -> Result<Creator, Error> {
        if self
            .repository
            .find_by_email(email)
            .await
            .map_err(map_repository_error)?
            .is_some()
        {
            return Err(Error::already_exists("Creator already exists."));
        }

        let creator = Creator::new(username, email, self.clock.utc());
        self.repository
            .insert(&creator)
            .await
            .map_err(map_repository_error)?;

        self.schedule(IndexJob::EnsureIndex {
            index: self.index_name.clone(),
        })
        .await;
        self.schedule(IndexJob::IndexDocument {
            index: self.index_name.clone(),
            doc_id: creator.id.to_string(),
            document: creator.to_index_document(),
        })
        .await;

        Ok(creator)
    }

    /// Fetch a creator by email.
    pub async fn get_creator(&self, email: &str) -> Result<Creator, Error> {
        self.require_creator(email).await
    }

    /// Append an asset to a creator and schedule the index update.
    pub async fn add_asset(&self, email: &str, kind: &str) -> Result<Asset, Error> {
        let mut creator = self.require_creator(email).await?;

        let asset = Asset::new(kind, self.clock.utc());
        creator.assets.push(asset.clone());

        self.repository
            .replace_assets(email, &creator.assets)
            .await
            .map_err(map_repository_error)?;
        self.schedule_assets_update(&creator).await;

        Ok(asset)
    }

    /// Remove the first asset of the given kind from a creator and schedule
    /// the index update.
    pub async fn remove_asset(&self, email: &str, kind: &str) -> Result<Asset, Error> {
        let mut creator = self.require_creator(email).await?;

        let position = creator
            .assets
            .iter()
            .position(|asset| asset.kind == kind)
            .ok_or_else(|| Error::not_found("Asset does not exist."))?;
        let removed = creator.assets.remove(position);

        self.repository
            .replace_assets(email, &creator.assets)
            .await
            .map_err(map_repository_error)?;
        self.schedule_assets_update(&creator).await;

        Ok(removed)
    }

    /// Delete a creator and schedule removal of its indexed document.
    pub async fn delete_creator(&self, email: &str) -> Result<Creator, Error> {
        let creator = self.require_creator(email).await?;

        self.repository
            .delete_by_email(email)
            .await
            .map_err(map_repository_error)?;

        self.schedule(IndexJob::DeleteDocument {
            index: self.index_name.clone(),
            doc_id: creator.id.to_string(),
        })
        .await;

        Ok(creator)
    }

    /// Free-text search over indexed creators, hydrated from the record
    /// store.
    ///
    /// The index supplies matching; the record store supplies authoritative
    /// content. Results come back in store order, not rank order. The index
    /// is a synchronous read dependency here, so its failures are fatal to
    /// this request.
    pub async fn search_creators(
        &self,
        text: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Creator>, Error> {
        let hits = self
            .search_index
            .search(&self.index_name, text, page, per_page)
            .await
            .map_err(map_search_error)?;

        let ids: Vec<CreatorId> = hits
            .doc_ids
            .iter()
            .filter_map(|raw| match CreatorId::parse(raw) {
                Ok(id) => Some(id),
                Err(error) => {
                    warn!(doc_id = raw.as_str(), %error, "skipping unparsable search hit id");
                    None
                }
            })
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.repository
            .find_by_ids(&ids)
            .await
            .map_err(map_repository_error)
    }

    async fn require_creator(&self, email: &str) -> Result<Creator, Error> {
        self.repository
            .find_by_email(email)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("Creator does not exist."))
    }

    async fn schedule_assets_update(&self, creator: &Creator) {
        self.schedule(IndexJob::UpdateDocument {
            index: self.index_name.clone(),
            doc_id: creator.id.to_string(),
            patch: assets_patch(&creator.assets),
        })
        .await;
    }

    /// Hand a job to the queue, fire-and-forget.
    ///
    /// A dispatch failure never fails the triggering request; it only
    /// degrades index freshness until a corrective re-index.
    async fn schedule(&self, job: IndexJob) {
        let label = job.label();
        if let Err(error) = self.queue.enqueue(job).await {
            warn!(job = label, %error, "index job dropped; search index will lag the record store");
        }
    }
}

fn map_repository_error(error: CreatorRepositoryError) -> Error {
    match error {
        CreatorRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("record store unavailable: {message}"))
        }
        CreatorRepositoryError::Query { message } => {
            Error::internal(format!("record store error: {message}"))
        }
        CreatorRepositoryError::DuplicateEmail { .. } => {
            Error::already_exists("Creator already exists.")
        }
    }
}

fn map_search_error(error: SearchIndexError) -> Error {
    match error {
        SearchIndexError::InvalidRequest { message } => Error::invalid_request(message),
        SearchIndexError::Transport { message } | SearchIndexError::Timeout { message } => {
            Error::service_unavailable(format!("search index unavailable: {message}"))
        }
        SearchIndexError::NotFound { message } => Error::not_found(message),
        SearchIndexError::AlreadyExists { message } | SearchIndexError::Decode { message } => {
            Error::internal(format!("search index error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        JobDispatchError, MockCreatorRepository, MockIndexJobQueue, MockSearchIndex, SearchPage,
    };
    use crate::domain::ErrorCode;
    use chrono::Utc;
    use mockable::DefaultClock;
    use mockall::predicate::eq;

    fn service(
        repository: MockCreatorRepository,
        search_index: MockSearchIndex,
        queue: MockIndexJobQueue,
    ) -> CreatorService {
        CreatorService::new(
            Arc::new(repository),
            Arc::new(search_index),
            Arc::new(queue),
            Arc::new(DefaultClock),
        )
    }

    fn stored_creator(email: &str) -> Creator {
        Creator::new("ada", email, Utc::now())
    }

    #[tokio::test]
    async fn add_creator_inserts_then_schedules_ensure_and_index() {
        let mut repository = MockCreatorRepository::new();
        repository
            .expect_find_by_email()
            .with(eq("ada@example.com"))
            .returning(|_| Ok(None));
        repository.expect_insert().returning(|_| Ok(()));

        let mut queue = MockIndexJobQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| matches!(job, IndexJob::EnsureIndex { index } if index == CREATOR_INDEX))
            .times(1)
            .returning(|_| Ok(()));
        queue
            .expect_enqueue()
            .withf(|job| {
                matches!(
                    job,
                    IndexJob::IndexDocument { index, document, .. }
                        if index == CREATOR_INDEX
                            && document["email"] == "ada@example.com"
                            && document.get("record_id").is_some()
                )
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, MockSearchIndex::new(), queue);

        let creator = service
            .add_creator("ada", "ada@example.com")
            .await
            .expect("creation succeeds");

        assert_eq!(creator.username, "ada");
        assert_eq!(creator.email, "ada@example.com");
        assert!(creator.assets.is_empty());
    }

    #[tokio::test]
    async fn add_creator_fails_when_email_is_taken() {
        let mut repository = MockCreatorRepository::new();
        repository
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_creator(email))));

        // No queue expectations: scheduling anything would panic the mock.
        let service = service(repository, MockSearchIndex::new(), MockIndexJobQueue::new());

        let err = service
            .add_creator("ada", "ada@example.com")
            .await
            .expect_err("duplicate email must fail");

        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(err.message(), "Creator already exists.");
    }

    #[tokio::test]
    async fn add_creator_maps_the_unique_index_backstop_to_already_exists() {
        let mut repository = MockCreatorRepository::new();
        repository.expect_find_by_email().returning(|_| Ok(None));
        repository.expect_insert().returning(|creator| {
            Err(CreatorRepositoryError::duplicate_email(&creator.email))
        });

        let service = service(repository, MockSearchIndex::new(), MockIndexJobQueue::new());

        let err = service
            .add_creator("ada", "ada@example.com")
            .await
            .expect_err("losing racer must fail");

        assert_eq!(err.code(), ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn add_creator_survives_a_queue_dispatch_failure() {
        let mut repository = MockCreatorRepository::new();
        repository.expect_find_by_email().returning(|_| Ok(None));
        repository.expect_insert().returning(|_| Ok(()));

        let mut queue = MockIndexJobQueue::new();
        queue
            .expect_enqueue()
            .times(2)
            .returning(|_| Err(JobDispatchError::queue_closed("workers stopped")));

        let service = service(repository, MockSearchIndex::new(), queue);

        service
            .add_creator("ada", "ada@example.com")
            .await
            .expect("a dropped job must not fail the request");
    }

    #[tokio::test]
    async fn add_asset_replaces_the_list_and_schedules_a_patch() {
        let mut repository = MockCreatorRepository::new();
        repository
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_creator(email))));
        repository
            .expect_replace_assets()
            .withf(|email, assets| {
                email == "ada@example.com" && assets.len() == 1 && assets[0].kind == "video"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut queue = MockIndexJobQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| {
                matches!(
                    job,
                    IndexJob::UpdateDocument { patch, .. }
                        if patch["assets"][0]["type"] == "video"
                )
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, MockSearchIndex::new(), queue);

        let asset = service
            .add_asset("ada@example.com", "video")
            .await
            .expect("asset appends");

        assert_eq!(asset.kind, "video");
    }

    #[tokio::test]
    async fn add_asset_fails_for_missing_creator() {
        let mut repository = MockCreatorRepository::new();
        repository.expect_find_by_email().returning(|_| Ok(None));

        let service = service(repository, MockSearchIndex::new(), MockIndexJobQueue::new());

        let err = service
            .add_asset("ghost@example.com", "video")
            .await
            .expect_err("missing creator must fail");

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Creator does not exist.");
    }

    #[tokio::test]
    async fn remove_asset_takes_the_first_matching_kind() {
        let mut repository = MockCreatorRepository::new();
        repository.expect_find_by_email().returning(|email| {
            let mut creator = stored_creator(email);
            creator.assets.push(Asset::new("video", Utc::now()));
            creator.assets.push(Asset::new("blog", Utc::now()));
            Ok(Some(creator))
        });
        repository
            .expect_replace_assets()
            .withf(|_, assets| assets.len() == 1 && assets[0].kind == "blog")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut queue = MockIndexJobQueue::new();
        queue
            .expect_enqueue()
            .withf(|job| matches!(job, IndexJob::UpdateDocument { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, MockSearchIndex::new(), queue);

        let removed = service
            .remove_asset("ada@example.com", "video")
            .await
            .expect("removal succeeds");

        assert_eq!(removed.kind, "video");
    }

    #[tokio::test]
    async fn remove_asset_fails_when_no_kind_matches() {
        let mut repository = MockCreatorRepository::new();
        repository
            .expect_find_by_email()
            .returning(|email| Ok(Some(stored_creator(email))));

        let service = service(repository, MockSearchIndex::new(), MockIndexJobQueue::new());

        let err = service
            .remove_asset("ada@example.com", "video")
            .await
            .expect_err("missing asset must fail");

        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.message(), "Asset does not exist.");
    }

    #[tokio::test]
    async fn delete_creator_schedules_document_removal() {
        let stored = stored_creator("ada@example.com");
        let expected_doc_id = stored.id.to_string();

        let mut repository = MockCreatorRepository::new();
        let found = stored.clone();
        repository
            .expect_find_by_email()
            .returning(move |_| Ok(Some(found.clone())));
        repository
            .expect_delete_by_email()
            .with(eq("ada@example.com"))
            .times(1)
            .returning(move |_| Ok(Some(stored.clone())));

        let mut queue = MockIndexJobQueue::new();
        queue
            .expect_enqueue()
            .withf(move |job| {
                matches!(
                    job,
                    IndexJob::DeleteDocument { doc_id, .. } if *doc_id == expected_doc_id
                )
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = service(repository, MockSearchIndex::new(), queue);

        let deleted = service
            .delete_creator("ada@example.com")
            .await
            .expect("deletion succeeds");

        assert_eq!(deleted.email, "ada@example.com");
    }

    #[tokio::test]
    async fn search_hydrates_hits_from_the_record_store() {
        let stored = stored_creator("ada@example.com");
        let hit_id = stored.id.to_string();

        let mut search_index = MockSearchIndex::new();
        search_index
            .expect_search()
            .with(eq(CREATOR_INDEX), eq("ada"), eq(1), eq(10))
            .returning(move |_, _, _, _| {
                Ok(SearchPage {
                    total: 1,
                    doc_ids: vec![hit_id.clone(), "not-a-uuid".to_owned()],
                })
            });

        let mut repository = MockCreatorRepository::new();
        let expected_id = stored.id;
        let hydrated = stored.clone();
        repository
            .expect_find_by_ids()
            .withf(move |ids| ids.len() == 1 && ids[0] == expected_id)
            .returning(move |_| Ok(vec![hydrated.clone()]));

        let service = service(repository, search_index, MockIndexJobQueue::new());

        let creators = service
            .search_creators("ada", 1, 10)
            .await
            .expect("search succeeds");

        assert_eq!(creators, vec![stored]);
    }

    #[tokio::test]
    async fn search_surfaces_pagination_errors_verbatim() {
        let mut search_index = MockSearchIndex::new();
        search_index.expect_search().returning(|_, _, _, _| {
            Err(SearchIndexError::invalid_request(
                "Page must be greater than or equal to 1.",
            ))
        });

        let service = service(
            MockCreatorRepository::new(),
            search_index,
            MockIndexJobQueue::new(),
        );

        let err = service
            .search_creators("ada", 0, 10)
            .await
            .expect_err("invalid pagination must fail");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.message(), "Page must be greater than or equal to 1.");
    }

    #[tokio::test]
    async fn search_with_no_hits_skips_store_hydration() {
        let mut search_index = MockSearchIndex::new();
        search_index
            .expect_search()
            .returning(|_, _, _, _| Ok(SearchPage::default()));

        // No find_by_ids expectation: hydrating an empty page would panic.
        let service = service(
            MockCreatorRepository::new(),
            search_index,
            MockIndexJobQueue::new(),
        );

        let creators = service
            .search_creators("nobody", 1, 10)
            .await
            .expect("search succeeds");

        assert!(creators.is_empty());
    }

    #[tokio::test]
    async fn search_maps_exhausted_retries_to_service_unavailable() {
        let mut search_index = MockSearchIndex::new();
        search_index
            .expect_search()
            .returning(|_, _, _, _| Err(SearchIndexError::transport("connection refused")));

        let service = service(
            MockCreatorRepository::new(),
            search_index,
            MockIndexJobQueue::new(),
        );

        let err = service
            .search_creators("ada", 1, 10)
            .await
            .expect_err("transport failure must surface");

        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
