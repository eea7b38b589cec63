//! Exponential back-off with jitter for adapter retries.
//!
//! Only [`shoerev_sources::AdapterError::Network`] is ever retried; the
//! orchestrator decides that, this module only computes and sleeps.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

const MAX_DELAY_MS: u64 = 60_000;

/// Delay before retry number `attempt` (1-based).
///
/// | Attempt | Sleep                        |
/// |---------|------------------------------|
/// | 1       | base × 2⁰ ± 25 % jitter      |
/// | 2       | base × 2¹ ± 25 % jitter      |
/// | 3       | base × 2² ± 25 % jitter      |
///
/// Capped at 60 s before jitter is applied.
#[must_use]
pub fn backoff_delay(backoff_base_ms: u64, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let computed = backoff_base_ms.saturating_mul(1u64 << exponent);
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(delay_ms)
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `false` when the sleep was cut short by cancellation.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
