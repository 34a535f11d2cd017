//! Creator directory backend.
//!
//! A record store (PostgreSQL) holds the authoritative creator data; a
//! search index holds a derived, eventually-consistent copy kept in
//! agreement by the synchronization engine and a background worker pool.

pub mod api;
pub mod domain;
pub mod outbound;
pub mod server;
