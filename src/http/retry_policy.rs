//! Retry policies for HTTP requests
//!
//! Transient failures (dropped connections, timeouts, gateway errors) are
//! retried with a growing delay. Anything else is returned immediately.

use crate::error::{Result, UtilError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy for HTTP requests
///
/// The delay before retry `n` is `backoff_factor * multiplier^(n-1)`,
/// capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub backoff_factor: Duration,
    /// Growth of the delay from one retry to the next
    pub multiplier: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Conditions that should trigger a retry
    pub retry_conditions: Vec<RetryCondition>,
}

/// Conditions that determine when to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCondition {
    /// Connection failures, resets and body read errors
    NetworkError,
    /// Requests that timed out
    Timeout,
    /// A specific HTTP status
    HttpStatus(u16),
}

/// Statuses retried by the default policy
pub const DEFAULT_STATUS_FORCELIST: [u16; 3] = [500, 502, 504];

/// Runs an operation under a [`RetryPolicy`]
pub struct RetryExecutor {
    policy: RetryPolicy,
    current_attempt: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let mut retry_conditions = vec![RetryCondition::NetworkError, RetryCondition::Timeout];
        retry_conditions.extend(DEFAULT_STATUS_FORCELIST.map(RetryCondition::HttpStatus));

        Self {
            max_retries: 8,
            backoff_factor: Duration::from_millis(300),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
            retry_conditions,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern methods
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_backoff_factor(mut self, delay: Duration) -> Self {
        self.backoff_factor = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Retry only on these conditions
    pub fn with_conditions(mut self, conditions: Vec<RetryCondition>) -> Self {
        self.retry_conditions = conditions;
        self
    }

    /// Total number of attempts, the first one included
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate the delay before retry number `retry` (1-based)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::from_millis(0);
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let delay_ms = self.backoff_factor.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64)
    }

    /// Check if an error should trigger a retry
    pub fn should_retry(&self, error: &UtilError) -> bool {
        self.retry_conditions
            .iter()
            .any(|condition| Self::matches_condition(*condition, error))
    }

    /// Check if a response status should trigger a retry
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_conditions
            .iter()
            .any(|condition| Self::matches_status(*condition, status))
    }

    fn matches_condition(condition: RetryCondition, error: &UtilError) -> bool {
        match (condition, error) {
            (RetryCondition::NetworkError, UtilError::Network(msg)) => !is_timeout_message(msg),
            (RetryCondition::Timeout, UtilError::Network(msg)) => is_timeout_message(msg),
            (_, UtilError::HttpStatus { status, .. }) => Self::matches_status(condition, *status),
            _ => false,
        }
    }

    const fn matches_status(condition: RetryCondition, status: u16) -> bool {
        match condition {
            RetryCondition::HttpStatus(expected) => status == expected,
            RetryCondition::NetworkError | RetryCondition::Timeout => false,
        }
    }

    /// Create an executor for this policy
    pub fn executor(&self) -> RetryExecutor {
        RetryExecutor::new(self.clone())
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout") || lower.contains("timed out")
}

impl RetryExecutor {
    /// Create a new retry executor
    pub const fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            current_attempt: 0,
        }
    }

    /// Execute a closure with retry logic
    pub async fn execute<F, Fut, T>(&mut self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.current_attempt = attempt;

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Request succeeded on attempt {}", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            if !self.policy.should_retry(&error) {
                debug!("Error does not match retry conditions: {}", error);
                return Err(error);
            }

            if attempt >= max_attempts {
                warn!("Giving up after {} attempts: {}", attempt, error);
                return Err(error);
            }

            let delay = self.policy.calculate_delay(attempt);
            warn!("Attempt {} failed ({}), retrying in {:?}", attempt, error, delay);

            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }

    /// Get the current attempt number
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}
