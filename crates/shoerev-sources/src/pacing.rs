//! Minimum spacing between one adapter's successive requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes an adapter's requests and keeps at least `delay` between them.
///
/// The lock is held while sleeping, so concurrent callers sharing one adapter
/// queue up instead of bursting.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Waits until the next request may be sent, then records it as sent.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_request_is_not_delayed() {
        let pacer = Pacer::from_millis(500);
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn successive_requests_are_spaced() {
        let pacer = Pacer::from_millis(500);
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_delay_after_idle_period() {
        let pacer = Pacer::from_millis(200);
        pacer.wait().await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
