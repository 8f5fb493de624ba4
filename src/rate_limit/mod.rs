//! Rate limiting for external API calls.
//!
//! Catalog lookups share one [`RateLimiter`] across every file in a batch so
//! the configured inter-call delay holds process-wide, not just per file.
//! Vision requests use the backoff helpers when the API answers 429.

mod limiter;

pub use limiter::RateLimiter;

use std::time::Duration;

/// Parse Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(60)))
}

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(60_000))
}
