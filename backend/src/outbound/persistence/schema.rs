//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly; regenerate
//! with `diesel print-schema` when migrations change.

diesel::table! {
    /// Creator rows, one per creator; assets live in a JSONB column owned
    /// wholly by the row.
    creators (id) {
        /// Primary key: UUID v4 assigned by the application at creation.
        id -> Uuid,
        /// Display name; not unique.
        username -> Varchar,
        /// Natural key for lookups; unique index `creators_email_unique`.
        email -> Varchar,
        /// Sign-up timestamp, set at creation and never mutated.
        signed_up -> Timestamptz,
        /// The creator's asset list, replaced as a unit on every mutation.
        assets -> Jsonb,
    }
}
