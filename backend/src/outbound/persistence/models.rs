//! Internal Diesel row structs for database operations.
//!
//! Implementation details of the persistence layer; never exposed to the
//! domain. Conversions to and from [`Creator`] live here so the repository
//! body stays query-shaped.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{Asset, Creator, CreatorId};

use super::schema::creators;

/// Row struct for reading from the creators table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = creators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CreatorRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub signed_up: DateTime<Utc>,
    pub assets: serde_json::Value,
}

/// Insertable struct for creating new creator rows.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = creators)]
pub(crate) struct NewCreatorRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub email: &'a str,
    pub signed_up: DateTime<Utc>,
    pub assets: serde_json::Value,
}

/// Row-to-domain conversion failure: the JSONB asset payload did not match
/// the asset schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored asset list for {email} is malformed: {message}")]
pub(crate) struct MalformedAssetsError {
    pub email: String,
    pub message: String,
}

impl CreatorRow {
    /// Convert a database row to the domain entity.
    pub(crate) fn into_domain(self) -> Result<Creator, MalformedAssetsError> {
        let assets: Vec<Asset> =
            serde_json::from_value(self.assets).map_err(|err| MalformedAssetsError {
                email: self.email.clone(),
                message: err.to_string(),
            })?;
        Ok(Creator {
            id: CreatorId::from_uuid(self.id),
            username: self.username,
            email: self.email,
            signed_up: self.signed_up,
            assets,
        })
    }
}

impl<'a> NewCreatorRow<'a> {
    /// Build an insertable row from the domain entity.
    pub(crate) fn from_domain(creator: &'a Creator) -> Self {
        Self {
            id: *creator.id.as_uuid(),
            username: &creator.username,
            email: &creator.email,
            signed_up: creator.signed_up,
            assets: serde_json::json!(creator.assets),
        }
    }
}
