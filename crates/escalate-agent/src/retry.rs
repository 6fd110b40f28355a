// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff for transient backend failures.
//!
//! Only errors for which [`EscalateError::is_transient`] holds are retried.
//! Rejected requests, configuration and tool errors return on first failure.

use std::future::Future;
use std::time::Duration;

use escalate_config::model::RetryConfig;
use escalate_core::EscalateError;
use rand::Rng;
use tracing::{info, warn};

/// Retry budget and delay schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    backoff_factor: f64,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            backoff_factor: config.backoff_factor,
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            jitter: config.jitter,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::from_config(&RetryConfig::default())
        }
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.initial_backoff.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let cap_ms = self.max_backoff.as_millis() as f64;
        let mut delay_ms = base_ms.min(cap_ms);
        if self.jitter {
            delay_ms *= rand::thread_rng().gen_range(0.5..1.5);
            delay_ms = delay_ms.min(cap_ms);
        }
        Duration::from_millis(delay_ms.max(0.0) as u64)
    }

    /// Run `call` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn retry_transient<T, F, Fut>(
        &self,
        operation: &str,
        mut call: F,
    ) -> Result<T, EscalateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EscalateError>>,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(operation, attempts = attempt, error = %e, "retry budget exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_attempts,
            initial_backoff_ms: 100,
            backoff_factor: 2.0,
            max_backoff_ms: 1_000,
            jitter: false,
        })
    }

    #[test]
    fn delays_grow_geometrically_up_to_cap() {
        let p = policy(10);
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(400));
        assert_eq!(p.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(p.delay_for(60), Duration::from_millis(1_000));
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let p = RetryPolicy::from_config(&RetryConfig {
            jitter: true,
            initial_backoff_ms: 200,
            max_backoff_ms: 250,
            ..RetryConfig::default()
        });
        for _ in 0..100 {
            let d = p.delay_for(1);
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(250));
        }
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(policy(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let result = policy(3)
            .retry_transient("complete", || async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(EscalateError::unavailable("ollama", "connection refused")),
                    _ => Ok("answer"),
                }
            })
            .await;
        assert_eq!(result.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(3)
            .retry_transient("complete", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EscalateError::Timeout {
                    duration: Duration::from_secs(1),
                })
            })
            .await;
        assert!(matches!(result, Err(EscalateError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(5)
            .retry_transient("complete", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EscalateError::provider("invalid api key"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
