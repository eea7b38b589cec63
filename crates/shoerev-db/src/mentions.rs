//! Database operations for the `mentions` table.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use shoerev_core::{MentionCandidate, MentionSource, UpsertOutcome};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: i64,
    pub public_id: Uuid,
    pub shoe_id: i64,
    /// One of `video`, `social_x`, `social_reddit` (enforced by a check constraint).
    pub source: String,
    /// `ext:<id>` or `url:<sha256>`; unique per `(shoe_id, source)`.
    pub identity_key: String,
    pub external_id: Option<String>,
    pub url: String,
    pub title: String,
    pub author: String,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub stale: bool,
}

/// Row counts shown by the CLI `config` command.
#[derive(Debug, Clone, Default)]
pub struct MentionStats {
    pub shoes: i64,
    pub mentions: i64,
    pub by_source: Vec<(String, i64)>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upserts one mention keyed on `(shoe_id, source, identity_key)`.
///
/// A conflicting row only has `title`/`author` refreshed, and only when they
/// differ; identity columns and `collected_at` never change. The unique
/// constraint makes this safe under concurrent writers without extra locking.
///
/// `xmax = 0` distinguishes a fresh insert from a conflict update; no row
/// coming back means the conflict path found nothing to change.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_mention(
    pool: &PgPool,
    mention: &MentionCandidate,
) -> Result<UpsertOutcome, DbError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        "INSERT INTO mentions \
             (public_id, shoe_id, source, identity_key, external_id, url, title, author, \
              published_at, collected_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT ON CONSTRAINT mentions_identity_key DO UPDATE SET \
             title      = EXCLUDED.title, \
             author     = EXCLUDED.author, \
             updated_at = NOW() \
         WHERE (mentions.title, mentions.author) \
               IS DISTINCT FROM (EXCLUDED.title, EXCLUDED.author) \
         RETURNING (xmax = 0)",
    )
    .bind(Uuid::new_v4())
    .bind(mention.shoe_id)
    .bind(mention.source().as_str())
    .bind(&mention.identity.key)
    .bind(&mention.external_id)
    .bind(&mention.url)
    .bind(&mention.title)
    .bind(&mention.author)
    .bind(mention.published_at)
    .bind(mention.collected_at)
    .fetch_optional(pool)
    .await?;

    Ok(match inserted {
        Some(true) => UpsertOutcome::Inserted,
        Some(false) => UpsertOutcome::Updated,
        None => UpsertOutcome::Unchanged,
    })
}

/// Returns the platforms that have at least one mention for `shoe_id`.
///
/// Unknown `source` values (from rows written by other tooling) are skipped.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collected_sources(
    pool: &PgPool,
    shoe_id: i64,
) -> Result<BTreeSet<MentionSource>, DbError> {
    let sources: Vec<String> =
        sqlx::query_scalar("SELECT DISTINCT source FROM mentions WHERE shoe_id = $1")
            .bind(shoe_id)
            .fetch_all(pool)
            .await?;

    Ok(sources
        .iter()
        .filter_map(|s| MentionSource::from_storage(s))
        .collect())
}

/// Returns all mentions for a shoe, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mentions_for_shoe(
    pool: &PgPool,
    shoe_id: i64,
) -> Result<Vec<MentionRow>, DbError> {
    let rows = sqlx::query_as::<_, MentionRow>(
        "SELECT id, public_id, shoe_id, source, identity_key, external_id, url, title, author, \
                published_at, collected_at, updated_at, stale \
         FROM mentions \
         WHERE shoe_id = $1 \
         ORDER BY collected_at DESC, id DESC",
    )
    .bind(shoe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Counts shoes and mentions, with a per-source breakdown.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn mention_stats(pool: &PgPool) -> Result<MentionStats, DbError> {
    let shoes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shoes")
        .fetch_one(pool)
        .await?;
    let mentions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mentions")
        .fetch_one(pool)
        .await?;
    let by_source: Vec<(String, i64)> = sqlx::query_as(
        "SELECT source, COUNT(*) FROM mentions GROUP BY source ORDER BY source",
    )
    .fetch_all(pool)
    .await?;

    Ok(MentionStats {
        shoes,
        mentions,
        by_source,
    })
}
