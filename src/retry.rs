//! Bounded retry with exponential backoff and jitter.
//!
//! Used where a cluster read may trail the write that preceded it: the call is
//! repeated until it succeeds, the attempt budget runs out, or the deadline
//! would be overrun by the next sleep.
//!
//! # Example
//!
//! ```ignore
//! use caas::retry::{retry_with_backoff, RetryConfig};
//!
//! let deployment = retry_with_backoff(
//!     &RetryConfig::with_deadline(Duration::from_secs(10)),
//!     "read_workload",
//!     || async { gateway.read(ResourceKind::Workload, "default", "demo-1a2b3c4d").await },
//! )
//! .await?;
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

/// How persistently to retry an operation.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = bounded only by `deadline`)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on a single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failure
    pub backoff_multiplier: f64,
    /// Hard limit on total time spent, including sleeps (None = unbounded)
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            deadline: Some(Duration::from_secs(10)),
        }
    }
}

impl RetryConfig {
    /// Retry until `deadline` elapses, with default delays
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            ..Default::default()
        }
    }

    /// Retry at most `attempts` times, with no deadline
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            deadline: None,
            ..Default::default()
        }
    }

    /// Make a single attempt
    pub fn once() -> Self {
        Self::with_max_attempts(1)
    }
}

/// Execute an async operation, retrying failures with exponential backoff.
///
/// Returns the first success, or the last error once the attempt budget is
/// spent or the next sleep would cross the deadline. If neither `max_attempts`
/// nor `deadline` is set the operation is retried until it succeeds.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %operation_name, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if config.max_attempts > 0 && attempt >= config.max_attempts {
            warn!(
                operation = %operation_name,
                attempt,
                error = %err,
                "giving up: attempts exhausted"
            );
            return Err(err);
        }

        // 0.5x to 1.5x of the nominal delay
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let mut sleep_for = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

        if let Some(deadline) = config.deadline {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    operation = %operation_name,
                    attempt,
                    error = %err,
                    "giving up: deadline reached"
                );
                return Err(err);
            }
            sleep_for = sleep_for.min(remaining);
        }

        debug!(
            operation = %operation_name,
            attempt,
            error = %err,
            delay_ms = sleep_for.as_millis() as u64,
            "operation failed, retrying"
        );

        tokio::time::sleep(sleep_for).await;

        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * config.backoff_multiplier).min(config.max_delay.as_secs_f64()),
        );
    }
}
