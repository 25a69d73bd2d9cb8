// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry and backoff helpers.
//!
//! - [`retry_api_call`] retries transient Kubernetes API errors (429, 5xx) with jittered
//!   exponential backoff and fails fast on everything else.
//! - [`error_requeue_delay`] is the per-key requeue delay after consecutive reconcile
//!   failures.
//! - [`RetryBudget`] bounds polling operations by `(count, interval)`; when the budget runs
//!   out the operation either fails or logs a warning and succeeds.

use crate::constants::{
    DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL_SECS, ERROR_REQUEUE_INITIAL_SECS,
    ERROR_REQUEUE_MAX_SECS,
};
use anyhow::{bail, Result};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Maximum total time to spend retrying (5 minutes)
const MAX_ELAPSED_TIME_SECS: u64 = 300;

/// Initial retry interval (100ms)
const INITIAL_INTERVAL_MILLIS: u64 = 100;

/// Maximum interval between retries (30 seconds)
const MAX_INTERVAL_SECS: u64 = 30;

/// Backoff multiplier
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Jitter applied to every interval (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Exponential backoff with jitter.
pub struct ExponentialBackoff {
    pub current_interval: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed_time: Option<Duration>,
    pub multiplier: f64,
    pub randomization_factor: f64,
    start_time: Instant,
}

impl ExponentialBackoff {
    fn new(
        initial_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Option<Duration>,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            initial_interval,
            max_interval,
            max_elapsed_time,
            multiplier,
            randomization_factor,
            start_time: Instant::now(),
        }
    }

    /// Next interval, or `None` once the elapsed time budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.start_time.elapsed() >= max_elapsed {
                return None;
            }
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        Some(jittered)
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;
        let jittered = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API retries: 100ms doubling to 30s, for at most 5 minutes.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(
        Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        Duration::from_secs(MAX_INTERVAL_SECS),
        Some(Duration::from_secs(MAX_ELAPSED_TIME_SECS)),
        BACKOFF_MULTIPLIER,
        RANDOMIZATION_FACTOR,
    )
}

/// Requeue delay after `consecutive_failures` failed reconciles of one key.
///
/// 5s for the first failure, doubling up to 5 minutes.
#[must_use]
pub fn error_requeue_delay(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(16);
    let secs = ERROR_REQUEUE_INITIAL_SECS.saturating_mul(1_u64 << exponent);
    Duration::from_secs(secs.min(ERROR_REQUEUE_MAX_SECS))
}

/// Retries a Kubernetes API call on transient errors.
///
/// # Errors
///
/// Returns the first non-retryable error, or an error once the backoff is exhausted.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !is_retryable_error(&e) {
                    return Err(e.into());
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable Kubernetes API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    error!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Backoff exhausted, giving up"
                    );
                    bail!("Backoff exhausted after {attempt} attempts: {e}");
                }
            }
        }
    }
}

/// Rate limiting (429), server errors (5xx) and transport failures are retryable.
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => {
            api_err.code == 429 || (api_err.code >= 500 && api_err.code < 600)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Bounds a polling operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub count: u32,
    pub interval: Duration,
    /// Fail when the budget runs out instead of logging and succeeding
    pub error_on_timeout: bool,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            count: DEFAULT_RETRY_COUNT,
            interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            error_on_timeout: true,
        }
    }
}

impl RetryBudget {
    /// Budget with `count` attempts `interval` apart. Zero values take the defaults.
    #[must_use]
    pub fn new(count: u32, interval: Duration, error_on_timeout: bool) -> Self {
        let defaults = Self::default();
        Self {
            count: if count == 0 { defaults.count } else { count },
            interval: if interval.is_zero() {
                defaults.interval
            } else {
                interval
            },
            error_on_timeout,
        }
    }

    /// Calls `check` until it reports `true` or the budget runs out.
    ///
    /// Errors from `check` count as a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns an error when the budget runs out and `error_on_timeout` is set.
    pub async fn poll<F, Fut>(&self, operation_name: &str, mut check: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        for attempt in 1..=self.count {
            match check().await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    debug!(operation = operation_name, attempt, "condition not met yet");
                }
                Err(e) => {
                    debug!(operation = operation_name, attempt, error = %e, "check failed");
                }
            }
            if attempt < self.count {
                tokio::time::sleep(self.interval).await;
            }
        }

        if self.error_on_timeout {
            bail!(
                "{operation_name} did not complete after {} attempts",
                self.count
            );
        }
        warn!(
            operation = operation_name,
            attempts = self.count,
            "gave up waiting, continuing"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
