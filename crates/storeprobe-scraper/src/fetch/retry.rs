//! Exponential backoff for transient fetch failures.
//!
//! Only [`ScraperError::RateLimited`] (HTTP 429) and [`ScraperError::Http`]
//! (connection reset, timeout, ...) are retried. Anything else is returned
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

fn is_retriable(err: &ScraperError) -> bool {
    matches!(
        err,
        ScraperError::RateLimited { .. } | ScraperError::Http(_)
    )
}

/// Executes `operation`, retrying transient errors up to `max_retries` times.
///
/// The wait before retry *n* (1-based) is `backoff_base_secs * 2^(n-1)`, or
/// the server's `Retry-After` when a 429 asks for longer.
///
/// | Attempt | Sleep before next attempt |
/// |---------|--------------------------|
/// | 0 (initial) | none |
/// | 1 (first retry) | base × 2^0 |
/// | 2 (second retry) | base × 2^1 |
pub(super) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let backoff = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        let delay_secs = match &err {
            ScraperError::RateLimited {
                retry_after_secs, ..
            } => backoff.max((*retry_after_secs).min(backoff_cap(backoff_base_secs))),
            _ => backoff,
        };
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

/// Upper bound on how long a `Retry-After` header may stall one fetch.
fn backoff_cap(backoff_base_secs: u64) -> u64 {
    backoff_base_secs.saturating_mul(30)
}
