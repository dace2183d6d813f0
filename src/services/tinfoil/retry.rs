use std::time::Duration;

use backoff::{backoff::Backoff, ExponentialBackoff};

use super::errors::{RetryError, TinfoilError};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: bool,
    pub total_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
            total_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = timeout;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt/time budget runs out. Delays follow exponential backoff with
/// jitter, except where the error class carries its own retry-after hint.
pub async fn with_retry<F, Fut, T>(config: RetryConfig, mut operation: F) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TinfoilError>>,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: config.initial_delay,
        max_interval: config.max_delay,
        multiplier: config.multiplier,
        max_elapsed_time: Some(config.total_timeout),
        ..Default::default()
    };
    if !config.jitter {
        backoff.randomization_factor = 0.0;
    }

    let start = std::time::Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        if start.elapsed() > config.total_timeout {
            return Err(RetryError::TimeoutExceeded);
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !error.is_retryable() {
                    return Err(RetryError::NonRetryable { source: error });
                }

                if attempts >= config.max_attempts {
                    return Err(RetryError::MaxAttemptsExceeded);
                }

                let delay = match error.retry_after_seconds() {
                    Some(seconds) => Duration::from_secs(seconds),
                    None => backoff.next_backoff().unwrap_or(config.max_delay),
                };

                tracing::warn!(
                    attempt = attempts,
                    %error,
                    ?delay,
                    "Retryable API error, backing off"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
