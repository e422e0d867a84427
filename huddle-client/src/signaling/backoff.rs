use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Delay before reconnect attempt `attempt` (0-based): uniform in
/// `[0, min(cap, base * 2^attempt)]`.
pub fn full_jitter(config: &BackoffConfig, attempt: u32) -> Duration {
    let ceiling = config
        .base
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(config.cap);
    let millis = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
}
