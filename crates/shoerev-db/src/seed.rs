use shoerev_core::ShoeConfig;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Upsert shoes from the catalog file into the database.
///
/// Returns the number of shoes processed (inserted or updated). All upserts
/// run inside a single transaction; if any fails the batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_shoes(pool: &PgPool, shoes: &[ShoeConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for shoe in shoes {
        sqlx::query(
            "INSERT INTO shoes (public_id, brand, model_name, category, aliases, release_year) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ((lower(brand)), (lower(model_name))) DO UPDATE SET \
                 category = EXCLUDED.category, \
                 aliases = EXCLUDED.aliases, \
                 release_year = EXCLUDED.release_year, \
                 updated_at = NOW()",
        )
        .bind(Uuid::new_v4())
        .bind(shoe.brand.trim())
        .bind(shoe.model.trim())
        .bind(&shoe.category)
        .bind(&shoe.aliases)
        .bind(shoe.release_year)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
