//! Domain entities, ports, and the synchronization engine.
//!
//! The record store is the source of truth; the search index is a derived,
//! eventually-consistent copy. Everything that keeps the two in agreement
//! lives here, behind ports implemented by the outbound adapters.

pub mod creator;
pub mod creator_service;
pub mod error;
pub mod index_worker;
pub mod ports;

pub use self::creator::{assets_patch, Asset, Creator, CreatorId, RECORD_ID_FIELD};
pub use self::creator_service::{CreatorService, CREATOR_INDEX};
pub use self::error::{Error, ErrorCode};
pub use self::index_worker::IndexJobRunner;
