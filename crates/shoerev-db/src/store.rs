//! Postgres-backed [`MentionStore`] and [`ShoeCatalog`].

use std::collections::BTreeSet;

use shoerev_core::{
    MentionCandidate, MentionSource, MentionStore, PersistenceError, Shoe, ShoeCatalog,
    UpsertOutcome,
};
use sqlx::PgPool;

use crate::retry::retry_once_on_connection_loss;
use crate::{mentions, shoes, DbError};

const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 250;

/// Maps a driver error onto the store-level error taxonomy.
///
/// Pool exhaustion, I/O and connection-class SQLSTATEs (`08xxx`) count as a
/// lost connection. Integrity-class SQLSTATEs (`23xxx`) become constraint
/// violations carrying the constraint name when Postgres reports one.
#[must_use]
pub fn classify_sqlx_error(err: &sqlx::Error) -> PersistenceError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => PersistenceError::ConnectionLost(err.to_string()),
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            if code.starts_with("08") {
                PersistenceError::ConnectionLost(db.message().to_owned())
            } else if code.starts_with("23") {
                PersistenceError::ConstraintViolation {
                    constraint: db.constraint().unwrap_or(code.as_str()).to_owned(),
                    message: db.message().to_owned(),
                }
            } else {
                PersistenceError::Query(db.message().to_owned())
            }
        }
        other => PersistenceError::Query(other.to_string()),
    }
}

fn classify_db_error(err: DbError) -> PersistenceError {
    match err {
        DbError::Sqlx(e) => classify_sqlx_error(&e),
        other => PersistenceError::Query(other.to_string()),
    }
}

/// Store handle shared by every collection run. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    reconnect_backoff_ms: u64,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            reconnect_backoff_ms: DEFAULT_RECONNECT_BACKOFF_MS,
        }
    }

    #[must_use]
    pub fn with_reconnect_backoff_ms(mut self, ms: u64) -> Self {
        self.reconnect_backoff_ms = ms;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl MentionStore for PgStore {
    async fn upsert(&self, mention: &MentionCandidate) -> Result<UpsertOutcome, PersistenceError> {
        retry_once_on_connection_loss(self.reconnect_backoff_ms, || async {
            mentions::upsert_mention(&self.pool, mention)
                .await
                .map_err(classify_db_error)
        })
        .await
    }

    async fn collected_sources(
        &self,
        shoe_id: i64,
    ) -> Result<BTreeSet<MentionSource>, PersistenceError> {
        retry_once_on_connection_loss(self.reconnect_backoff_ms, || async {
            mentions::list_collected_sources(&self.pool, shoe_id)
                .await
                .map_err(classify_db_error)
        })
        .await
    }
}

impl ShoeCatalog for PgStore {
    async fn get_shoe(&self, shoe_id: i64) -> Result<Option<Shoe>, PersistenceError> {
        retry_once_on_connection_loss(self.reconnect_backoff_ms, || async {
            shoes::get_shoe(&self.pool, shoe_id)
                .await
                .map(|row| row.map(Shoe::from))
                .map_err(classify_db_error)
        })
        .await
    }

    async fn list_shoes(&self, limit: usize) -> Result<Vec<Shoe>, PersistenceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        retry_once_on_connection_loss(self.reconnect_backoff_ms, || async {
            shoes::list_shoes(&self.pool, limit)
                .await
                .map(|rows| rows.into_iter().map(Shoe::from).collect())
                .map_err(classify_db_error)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_classify_as_connection_lost() {
        assert!(classify_sqlx_error(&sqlx::Error::PoolTimedOut).is_connection_lost());
        assert!(classify_sqlx_error(&sqlx::Error::PoolClosed).is_connection_lost());
        assert!(classify_sqlx_error(&sqlx::Error::WorkerCrashed).is_connection_lost());
    }

    #[test]
    fn io_error_classifies_as_connection_lost() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(classify_sqlx_error(&sqlx::Error::Io(io)).is_connection_lost());
    }

    #[test]
    fn row_not_found_classifies_as_query_error() {
        assert!(matches!(
            classify_sqlx_error(&sqlx::Error::RowNotFound),
            PersistenceError::Query(_)
        ));
    }

    #[test]
    fn migration_db_error_maps_to_query() {
        assert!(matches!(
            classify_db_error(DbError::Migration(
                sqlx::migrate::MigrateError::VersionMissing(3)
            )),
            PersistenceError::Query(_)
        ));
    }
}
