use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// §4.7: `min(initial_delay * base^attempt, max_delay)`, scaled by a
/// uniform jitter in `[0.75, 1.25]` when `config.jitter` is set. `attempt`
/// is zero-based (the delay before the *second* call uses `attempt = 0`).
pub fn next_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = config.exponential_base.powi(attempt as i32);
    let unjittered = (config.initial_delay.as_secs_f64() * exponent).min(config.max_delay.as_secs_f64());

    let seconds = if config.jitter {
        let factor = rand::thread_rng().gen_range(0.75..=1.25);
        unjittered * factor
    } else {
        unjittered
    };

    Duration::from_secs_f64(seconds.max(0.0))
}
