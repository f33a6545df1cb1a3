//! Bounded retry for storage reads.

use std::future::Future;
use std::time::Duration;

use crate::error::LeagueError;

/// Delay unit for linear backoff: attempt `n` waits `n * base`.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_millis(500);

/// Runs `op` up to `attempts` times, sleeping `attempt * backoff` between
/// failures.
///
/// Only use this for reads; writes are not idempotent in general.
///
/// # Errors
///
/// Returns the last error once every attempt has failed.
pub async fn read_with_retry<T, F, Fut>(
    label: &str,
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, LeagueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LeagueError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                let delay = backoff.saturating_mul(attempt);
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "storage read failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    operation = label,
                    attempts,
                    error = %e,
                    "storage read failed, giving up"
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = read_with_retry("load", 3, Duration::ZERO, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(LeagueError::Persistence("connection reset".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert!(matches!(result, Ok(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = read_with_retry("load", 2, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LeagueError::Persistence("down".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
