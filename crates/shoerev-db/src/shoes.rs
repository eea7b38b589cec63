//! Database operations for the `shoes` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `shoes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShoeRow {
    pub id: i64,
    pub public_id: Uuid,
    pub brand: String,
    pub model_name: String,
    pub category: Option<String>,
    pub aliases: Vec<String>,
    pub release_year: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShoeRow> for shoerev_core::Shoe {
    fn from(row: ShoeRow) -> Self {
        Self {
            id: row.id,
            brand: row.brand,
            model_name: row.model_name,
            category: row.category,
            aliases: row.aliases,
        }
    }
}

/// Returns the newest `limit` shoes, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shoes(pool: &PgPool, limit: i64) -> Result<Vec<ShoeRow>, DbError> {
    let rows = sqlx::query_as::<_, ShoeRow>(
        "SELECT id, public_id, brand, model_name, category, aliases, release_year, \
                created_at, updated_at \
         FROM shoes \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single shoe by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shoe(pool: &PgPool, id: i64) -> Result<Option<ShoeRow>, DbError> {
    let row = sqlx::query_as::<_, ShoeRow>(
        "SELECT id, public_id, brand, model_name, category, aliases, release_year, \
                created_at, updated_at \
         FROM shoes \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
