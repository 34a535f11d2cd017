//! Port for creator persistence in the record store.
//!
//! The record store is the system of record: every mutation lands here
//! synchronously before any index propagation is scheduled. Operations are
//! atomic at single-row granularity; no multi-row transactions are used or
//! required.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Asset, Creator, CreatorId};

/// Errors raised by creator repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreatorRepositoryError {
    /// Repository connection could not be established.
    #[error("creator repository connection failed: {message}")]
    Connection { message: String },

    /// Query or mutation failed during execution.
    #[error("creator repository query failed: {message}")]
    Query { message: String },

    /// Insert violated the unique index on `email`.
    #[error("creator with email {email} already exists")]
    DuplicateEmail { email: String },
}

impl CreatorRepositoryError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a duplicate-email error for the given address.
    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }
}

/// Port for durable creator storage, addressed by email and id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreatorRepository: Send + Sync {
    /// Fetch a creator by their email address.
    ///
    /// Returns `None` when no creator is stored under that email.
    async fn find_by_email(&self, email: &str)
        -> Result<Option<Creator>, CreatorRepositoryError>;

    /// Insert a new creator row.
    ///
    /// Fails with [`CreatorRepositoryError::DuplicateEmail`] when the store's
    /// unique index rejects the email — the backstop for two concurrent
    /// creates passing the application-level existence check.
    async fn insert(&self, creator: &Creator) -> Result<(), CreatorRepositoryError>;

    /// Replace one creator's asset list wholesale.
    async fn replace_assets(
        &self,
        email: &str,
        assets: &[Asset],
    ) -> Result<(), CreatorRepositoryError>;

    /// Delete a creator by email, returning the deleted row.
    ///
    /// Returns `None` when no creator is stored under that email.
    async fn delete_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Creator>, CreatorRepositoryError>;

    /// Fetch creators by id. Order is not guaranteed to match the input.
    async fn find_by_ids(
        &self,
        ids: &[CreatorId],
    ) -> Result<Vec<Creator>, CreatorRepositoryError>;
}

/// In-memory repository for tests and fixture wiring.
///
/// Keyed by email like the durable adapter's natural-key lookups; iteration
/// order is deterministic so tests can assert on result sets.
#[derive(Debug, Default)]
pub struct FixtureCreatorRepository {
    rows: Mutex<BTreeMap<String, Creator>>,
}

impl FixtureCreatorRepository {
    /// Create an empty fixture repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored creators.
    pub fn len(&self) -> usize {
        self.rows.lock().expect("fixture store lock").len()
    }

    /// Whether the fixture store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CreatorRepository for FixtureCreatorRepository {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Creator>, CreatorRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("fixture store lock")
            .get(email)
            .cloned())
    }

    async fn insert(&self, creator: &Creator) -> Result<(), CreatorRepositoryError> {
        let mut rows = self.rows.lock().expect("fixture store lock");
        if rows.contains_key(&creator.email) {
            return Err(CreatorRepositoryError::duplicate_email(&creator.email));
        }
        rows.insert(creator.email.clone(), creator.clone());
        Ok(())
    }

    async fn replace_assets(
        &self,
        email: &str,
        assets: &[Asset],
    ) -> Result<(), CreatorRepositoryError> {
        let mut rows = self.rows.lock().expect("fixture store lock");
        let creator = rows
            .get_mut(email)
            .ok_or_else(|| CreatorRepositoryError::query("creator not found for update"))?;
        creator.assets = assets.to_vec();
        Ok(())
    }

    async fn delete_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Creator>, CreatorRepositoryError> {
        Ok(self
            .rows
            .lock()
            .expect("fixture store lock")
            .remove(email))
    }

    async fn find_by_ids(
        &self,
        ids: &[CreatorId],
    ) -> Result<Vec<Creator>, CreatorRepositoryError> {
        let rows = self.rows.lock().expect("fixture store lock");
        Ok(rows
            .values()
            .filter(|creator| ids.contains(&creator.id))
            .cloned()
            .collect())
    }
}
