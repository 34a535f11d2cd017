//! End-to-end coverage of the synchronization engine: the real service and
//! background queue over in-memory adapters.
//!
//! The record store must reflect every mutation synchronously; the search
//! index catches up through the worker pool. Tests flush propagation with
//! `QueueDepth::wait_idle` before asserting eventual-consistency properties.

use std::sync::Arc;

use chrono::Utc;
use mockable::DefaultClock;

use backend::domain::ports::{FixtureCreatorRepository, FixtureSearchIndex};
use backend::domain::{CreatorService, ErrorCode, CREATOR_INDEX};
use backend::outbound::queue::{ChannelIndexQueue, IndexWorkerPool, QueueDepth};

struct Harness {
    service: CreatorService,
    repository: Arc<FixtureCreatorRepository>,
    search_index: Arc<FixtureSearchIndex>,
    depth: Arc<QueueDepth>,
}

impl Harness {
    fn start(workers: usize) -> Self {
        let repository = Arc::new(FixtureCreatorRepository::new());
        let search_index = Arc::new(FixtureSearchIndex::new());
        let (queue, receiver) = ChannelIndexQueue::new();
        let depth = queue.depth();
        // The pool outlives the harness; workers exit when the queue drops
        // with the service at the end of each test.
        IndexWorkerPool::spawn(receiver, search_index.clone(), workers);

        let service = CreatorService::new(
            repository.clone(),
            search_index.clone(),
            Arc::new(queue),
            Arc::new(DefaultClock),
        );

        Self {
            service,
            repository,
            search_index,
            depth,
        }
    }

    /// Flush all scheduled index propagation.
    async fn flush(&self) {
        self.depth.wait_idle().await;
    }
}

#[tokio::test]
async fn created_creator_is_immediately_readable_with_empty_assets() {
    let harness = Harness::start(1);

    let created = harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");

    let fetched = harness
        .service
        .get_creator("ada@example.com")
        .await
        .expect("read-after-write succeeds");

    assert_eq!(fetched, created);
    assert_eq!(fetched.username, "ada");
    assert_eq!(fetched.email, "ada@example.com");
    assert!(fetched.assets.is_empty());
}

#[tokio::test]
async fn second_create_with_the_same_email_fails_and_stores_one_row() {
    let harness = Harness::start(1);

    harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("first creation succeeds");

    let err = harness
        .service
        .add_creator("impostor", "ada@example.com")
        .await
        .expect_err("second creation fails");

    assert_eq!(err.code(), ErrorCode::AlreadyExists);
    assert_eq!(err.message(), "Creator already exists.");
    assert_eq!(harness.repository.len(), 1);
}

#[tokio::test]
async fn add_asset_appends_exactly_one_with_a_fresh_timestamp() {
    let harness = Harness::start(1);
    harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");

    let before = Utc::now();
    let asset = harness
        .service
        .add_asset("ada@example.com", "video")
        .await
        .expect("asset appends");

    assert_eq!(asset.kind, "video");
    assert!(asset.created_at >= before);

    let creator = harness
        .service
        .get_creator("ada@example.com")
        .await
        .expect("read succeeds");
    assert_eq!(creator.assets.len(), 1);
    assert_eq!(creator.assets[0], asset);
}

#[tokio::test]
async fn add_asset_to_a_missing_creator_changes_nothing() {
    let harness = Harness::start(1);

    let err = harness
        .service
        .add_asset("ghost@example.com", "video")
        .await
        .expect_err("missing creator fails");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "Creator does not exist.");
    assert!(harness.repository.is_empty());
}

#[tokio::test]
async fn remove_asset_removes_exactly_the_added_one_and_only_once() {
    let harness = Harness::start(1);
    harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");
    let added = harness
        .service
        .add_asset("ada@example.com", "video")
        .await
        .expect("asset appends");

    let removed = harness
        .service
        .remove_asset("ada@example.com", "video")
        .await
        .expect("removal succeeds");
    assert_eq!(removed, added);

    let creator = harness
        .service
        .get_creator("ada@example.com")
        .await
        .expect("read succeeds");
    assert!(creator.assets.is_empty());

    let err = harness
        .service
        .remove_asset("ada@example.com", "video")
        .await
        .expect_err("second removal fails");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "Asset does not exist.");
}

#[tokio::test]
async fn deleted_creator_is_gone_from_the_record_store() {
    let harness = Harness::start(1);
    harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");

    let deleted = harness
        .service
        .delete_creator("ada@example.com")
        .await
        .expect("deletion succeeds");
    assert_eq!(deleted.email, "ada@example.com");

    let err = harness
        .service
        .get_creator("ada@example.com")
        .await
        .expect_err("read fails after delete");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn pagination_below_one_fails_before_store_hydration() {
    let harness = Harness::start(1);

    let err = harness
        .service
        .search_creators("ada", 0, 10)
        .await
        .expect_err("page 0 fails");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "Page must be greater than or equal to 1.");

    let err = harness
        .service
        .search_creators("ada", 1, 0)
        .await
        .expect_err("per_page 0 fails");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.message(),
        "Per page must be greater than or equal to 1."
    );
}

#[tokio::test]
async fn search_finds_a_creator_after_background_propagation() {
    let harness = Harness::start(2);

    let created = harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");

    harness.flush().await;

    let hits = harness
        .service
        .search_creators("ada@example.com", 1, 10)
        .await
        .expect("search succeeds");

    assert_eq!(hits, vec![created]);
}

#[tokio::test]
async fn asset_mutations_propagate_to_the_indexed_document() {
    let harness = Harness::start(1);

    let created = harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");
    harness
        .service
        .add_asset("ada@example.com", "video")
        .await
        .expect("asset appends");

    harness.flush().await;

    let document = harness
        .search_index
        .document(CREATOR_INDEX, &created.id.to_string())
        .expect("document indexed");
    assert_eq!(document["assets"][0]["type"], "video");
    assert_eq!(
        document["record_id"],
        serde_json::Value::String(created.id.to_string())
    );

    harness
        .service
        .remove_asset("ada@example.com", "video")
        .await
        .expect("removal succeeds");
    harness.flush().await;

    let document = harness
        .search_index
        .document(CREATOR_INDEX, &created.id.to_string())
        .expect("document still indexed");
    assert_eq!(document["assets"], serde_json::json!([]));
}

#[tokio::test]
async fn delete_propagation_removes_the_indexed_document() {
    let harness = Harness::start(1);

    let created = harness
        .service
        .add_creator("ada", "ada@example.com")
        .await
        .expect("creation succeeds");
    harness.flush().await;
    assert!(harness
        .search_index
        .document(CREATOR_INDEX, &created.id.to_string())
        .is_some());

    harness
        .service
        .delete_creator("ada@example.com")
        .await
        .expect("deletion succeeds");
    harness.flush().await;

    assert!(harness
        .search_index
        .document(CREATOR_INDEX, &created.id.to_string())
        .is_none());

    let hits = harness
        .service
        .search_creators("ada@example.com", 1, 10)
        .await
        .expect("search succeeds");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn repeated_creates_only_race_the_index_creation_idempotently() {
    let harness = Harness::start(4);

    for n in 0..5 {
        harness
            .service
            .add_creator("user", &format!("user{n}@example.com"))
            .await
            .expect("creation succeeds");
    }

    harness.flush().await;

    // Five EnsureIndex jobs raced across four workers; the index exists and
    // every document survived.
    assert!(harness.search_index.has_index(CREATOR_INDEX));
    let hits = harness
        .service
        .search_creators("example.com", 1, 10)
        .await
        .expect("search succeeds");
    assert_eq!(hits.len(), 5);
}
