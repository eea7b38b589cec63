//! Persistence seams used by the collector.
//!
//! The Postgres implementation lives in `shoerev-db`; tests substitute an
//! in-memory store enforcing the same uniqueness key.

use std::collections::BTreeSet;
use std::future::Future;

use thiserror::Error;

use crate::mention::{MentionCandidate, MentionSource};
use crate::shoes::Shoe;

/// Result of upserting one mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store could not be reached; worth one retry.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A constraint other than the mention identity key rejected the write.
    /// Signals a bug or a schema mismatch, never retried.
    #[error("constraint violation ({constraint}): {message}")]
    ConstraintViolation { constraint: String, message: String },

    #[error("query failed: {0}")]
    Query(String),
}

impl PersistenceError {
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, PersistenceError::ConnectionLost(_))
    }
}

/// Idempotent mention writes.
///
/// Implementations must rely on a store-level uniqueness constraint over
/// `(shoe_id, source, identity key)` so concurrent writers never duplicate a row.
pub trait MentionStore: Send + Sync {
    fn upsert(
        &self,
        mention: &MentionCandidate,
    ) -> impl Future<Output = Result<UpsertOutcome, PersistenceError>> + Send;

    /// Platforms with at least one stored mention for the shoe.
    fn collected_sources(
        &self,
        shoe_id: i64,
    ) -> impl Future<Output = Result<BTreeSet<MentionSource>, PersistenceError>> + Send;
}

/// Read access to the externally owned shoe catalog.
pub trait ShoeCatalog: Send + Sync {
    fn get_shoe(
        &self,
        shoe_id: i64,
    ) -> impl Future<Output = Result<Option<Shoe>, PersistenceError>> + Send;

    /// Newest `limit` shoes.
    fn list_shoes(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Shoe>, PersistenceError>> + Send;
}
