//! PostgreSQL-backed `CreatorRepository` implementation using Diesel.
//!
//! Each mutating call durably changes exactly one creator row; the unique
//! index on `email` backstops the service's check-then-act existence
//! pre-check.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{CreatorRepository, CreatorRepositoryError};
use crate::domain::{Asset, Creator, CreatorId};

use super::models::{CreatorRow, MalformedAssetsError, NewCreatorRow};
use super::pool::{DbPool, PoolError};
use super::schema::creators;

/// Diesel-backed implementation of the `CreatorRepository` port.
#[derive(Clone)]
pub struct DieselCreatorRepository {
    pool: DbPool,
}

impl DieselCreatorRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map pool errors to port errors.
fn map_pool_error(error: PoolError) -> CreatorRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            CreatorRepositoryError::connection(message)
        }
    }
}

/// Map Diesel errors to port errors.
fn map_diesel_error(error: diesel::result::Error) -> CreatorRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => CreatorRepositoryError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            CreatorRepositoryError::connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => CreatorRepositoryError::query("database error"),
        _ => CreatorRepositoryError::query("database error"),
    }
}

fn map_malformed_assets(error: MalformedAssetsError) -> CreatorRepositoryError {
    CreatorRepositoryError::query(error.to_string())
}

#[async_trait]
impl CreatorRepository for DieselCreatorRepository {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Creator>, CreatorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CreatorRow> = creators::table
            .filter(creators::email.eq(email))
            .select(CreatorRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(|row| row.into_domain().map_err(map_malformed_assets))
            .transpose()
    }

    async fn insert(&self, creator: &Creator) -> Result<(), CreatorRepositoryError> {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let new_row = NewCreatorRow::from_domain(creator);

        diesel::insert_into(creators::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| match error {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    CreatorRepositoryError::duplicate_email(&creator.email)
                }
                other => map_diesel_error(other),
            })
    }

    async fn replace_assets(
        &self,
        email: &str,
        assets: &[Asset],
    ) -> Result<(), CreatorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated_rows = diesel::update(creators::table.filter(creators::email.eq(email)))
            .set(creators::assets.eq(serde_json::json!(assets)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(CreatorRepositoryError::query(
                "creator not found for update",
            ));
        }
        Ok(())
    }

    async fn delete_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Creator>, CreatorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<CreatorRow> =
            diesel::delete(creators::table.filter(creators::email.eq(email)))
                .returning(CreatorRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
                .map_err(map_diesel_error)?;

        row.map(|row| row.into_domain().map_err(map_malformed_assets))
            .transpose()
    }

    async fn find_by_ids(
        &self,
        ids: &[CreatorId],
    ) -> Result<Vec<Creator>, CreatorRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows: Vec<CreatorRow> = creators::table
            .filter(creators::id.eq_any(uuids))
            .select(CreatorRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(map_malformed_assets))
            .collect()
    }
}
