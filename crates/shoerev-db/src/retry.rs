//! Single-retry wrapper for store writes that lose their connection.
//!
//! Only [`PersistenceError::ConnectionLost`] is retried, and only once.
//! Constraint violations and query errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use shoerev_core::PersistenceError;

/// Runs `operation`, retrying once after a jittered delay when the first
/// attempt fails with a lost connection.
pub(crate) async fn retry_once_on_connection_loss<T, F, Fut>(
    backoff_ms: u64,
    mut operation: F,
) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(err) if err.is_connection_lost() => {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let delay_ms = (backoff_ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
            tracing::warn!(delay_ms, error = %err, "store connection lost, retrying once");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            operation().await
        }
        Err(err) => Err(err),
    }
}
