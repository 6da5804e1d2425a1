//! Backoff for transient API failures
//!
//! Every completion call goes through [`retry_with_backoff`]. Only errors
//! that [`is_retryable_error`] accepts are retried; anything else is returned
//! at once. The default [`QcOptions`](crate::QcOptions) use a single attempt.
//!
//! ```rust,no_run
//! use qc_vision::retry::{retry_with_backoff, RetryConfig};
//! use qc_vision::{QcClient, QcOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = QcClient::new(QcOptions::from_env()?)?;
//! let config = RetryConfig::default()
//!     .with_max_attempts(3)
//!     .with_initial_delay(Duration::from_millis(500));
//!
//! let raw = retry_with_backoff(config, || {
//!     client.perform_qc_check("Compare", "img/ref.jpg", "img/chk.jpg")
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How often and how patiently to retry
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first call
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor applied per attempt
    pub backoff_multiplier: f64,

    /// Fraction of the delay randomized around its midpoint (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts (at least one)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set jitter factor, clamped to 0.0..=1.0
    pub fn with_jitter_factor(mut self, jitter: f64) -> Self {
        self.jitter_factor = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay after the failed attempt number `attempt` (zero based)
    fn delay_after(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let grown = base_ms * self.backoff_multiplier.powi(attempt as i32);
        let capped = grown.min(self.max_delay.as_millis() as f64);

        let spread = capped * self.jitter_factor;
        let jittered = capped - spread / 2.0 + rand::random::<f64>() * spread;

        Duration::from_millis(jittered.max(0.0) as u64)
    }
}

/// True for failures worth another attempt: transport errors, timeouts,
/// 429 and 5xx responses.
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Http(_) | Error::Timeout => true,
        Error::Status { status, .. } => *status == 429 || (500..600).contains(status),
        _ => false,
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is used up. The last error is returned.
pub async fn retry_with_backoff<F, Fut, T>(config: RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        if attempt >= attempts || !is_retryable_error(&err) {
            return Err(err);
        }

        let delay = config.delay_after(attempt - 1);
        tracing::warn!(
            "Attempt {} of {} failed, retrying in {:?}: {}",
            attempt,
            attempts,
            delay,
            err
        );
        sleep(delay).await;
    }
}
