//! Record store adapter: Diesel/PostgreSQL persistence for creators.

mod diesel_creator_repository;
mod models;
mod pool;
mod schema;

use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub use diesel_creator_repository::DieselCreatorRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

/// Migrations compiled into the binary and applied at startup.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying startup migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The migration connection could not be established.
    #[error("failed to connect for migrations: {0}")]
    Connection(#[from] diesel::ConnectionError),

    /// A migration failed to apply.
    #[error("failed to run migrations: {0}")]
    Apply(String),

    /// The blocking migration task was cancelled or panicked.
    #[error("migration task failed: {0}")]
    Join(String),
}

/// Apply pending migrations before the pool starts serving requests.
///
/// Diesel migrations are synchronous, so this runs on the blocking thread
/// pool with a dedicated short-lived connection.
pub async fn run_pending_migrations(database_url: &str) -> Result<(), MigrationError> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::PgConnection::establish(&database_url)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|_| ())
            .map_err(|err| MigrationError::Apply(err.to_string()))
    })
    .await
    .map_err(|err| MigrationError::Join(err.to_string()))?
}
