use crate::config::RetryConfig;

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `attempt` (zero-based): exponential in the
/// attempt, capped, plus up to half the base delay of jitter.
pub(crate) fn backoff(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = config
        .base_delay
        .saturating_mul(2_u32.saturating_pow(attempt))
        .min(config.max_delay);

    let jitter_ms = (config.base_delay.as_millis() / 2) as u64;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };

    exp + Duration::from_millis(jitter)
}
