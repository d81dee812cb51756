// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A retry loop driven by the verdict of classified errors.
//!
//! [run_with_retries] repeats an operation while it fails with a retryable
//! [ServiceError]. The loop makes no judgement of its own: an error is
//! retried if and only if [ServiceError::retryable] returns `true`.
//!
//! When the loop gives up it returns a [RetryHelperError]. Use
//! [translate_and_propagate] to recover the [ServiceError] that stopped the
//! loop.
//!
//! # Example
//! ```
//! # use google_cloud_service_errors::classifier::ErrorClassifier;
//! # use google_cloud_service_errors::error::*;
//! # use google_cloud_service_errors::retry_helper::*;
//! # tokio_test::block_on(async {
//! use tokio_util::sync::CancellationToken;
//! let classifier = ErrorClassifier::new(RetryRules::from_iter([RetryRule::new().set_code(503)]));
//! let settings = RetrySettings::new().with_max_attempts(3);
//! let result = run_with_retries(&settings, &CancellationToken::new(), || {
//!     let classifier = classifier.clone();
//!     async move { Err::<(), _>(classifier.classify_code(404, "missing", Some("notFound"), true)) }
//! })
//! .await;
//! let error = result.expect_err("not found is not retryable");
//! match translate_and_propagate(error) {
//!     Propagation::Reclassified(e) => assert_eq!(e.code(), 404),
//!     other => panic!("unexpected {other:?}"),
//! }
//! # });
//! ```

use crate::error::ServiceError;
use crate::exponential_backoff::ExponentialBackoff;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for [run_with_retries].
///
/// # Example
/// ```
/// # use google_cloud_service_errors::retry_helper::RetrySettings;
/// # use google_cloud_service_errors::exponential_backoff::ExponentialBackoffBuilder;
/// use std::time::Duration;
/// let settings = RetrySettings::new()
///     .with_max_attempts(10)
///     .with_total_timeout(Duration::from_secs(30))
///     .with_backoff(
///         ExponentialBackoffBuilder::new()
///             .with_initial_delay(Duration::from_millis(100))
///             .with_maximum_delay(Duration::from_secs(5))
///             .clamp(),
///     );
/// assert_eq!(settings.max_attempts(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct RetrySettings {
    max_attempts: u32,
    total_timeout: Option<Duration>,
    backoff: ExponentialBackoff,
}

impl RetrySettings {
    /// Creates the default settings: 6 attempts, no total timeout, and the
    /// default [ExponentialBackoff].
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the maximum number of attempts, including the first one.
    pub fn with_max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = v;
        self
    }

    /// Limit the total time spent in the loop, including the backoff delays.
    pub fn with_total_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.total_timeout = Some(v.into());
        self
    }

    /// Change the backoff between attempts.
    pub fn with_backoff(mut self, v: ExponentialBackoff) -> Self {
        self.backoff = v;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout
    }

    pub fn backoff(&self) -> &ExponentialBackoff {
        &self.backoff
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            total_timeout: None,
            backoff: ExponentialBackoff::default(),
        }
    }
}

/// The retry loop was cancelled while waiting for the next attempt.
#[derive(thiserror::Error, Debug)]
#[error("the retry loop was interrupted after {attempts} attempt(s)")]
pub struct RetryInterrupted {
    attempts: u32,
}

impl RetryInterrupted {
    /// The number of attempts completed before the interruption.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// The error returned by [run_with_retries].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RetryHelperError {
    /// The loop stopped, `source` is the error from the last attempt.
    #[error("the operation failed after {attempts} attempt(s): {source}")]
    Exhausted { attempts: u32, source: BoxError },
    /// The loop was cancelled.
    #[error(transparent)]
    Interrupted(#[from] RetryInterrupted),
}

/// The result of [translate_and_propagate].
#[derive(Debug)]
pub enum Propagation {
    /// The loop stopped with an error that is not a [ServiceError].
    Unchanged(RetryHelperError),
    /// The loop stopped with this [ServiceError].
    Reclassified(ServiceError),
    /// The loop was cancelled.
    Interrupted(RetryInterrupted),
}

/// Calls `op` until it succeeds or the loop gives up.
///
/// The loop stops when:
/// - `op` returns an error that is not a retryable [ServiceError],
/// - `op` has been called [max_attempts][RetrySettings::max_attempts] times,
/// - waiting for the next attempt would exceed the
///   [total timeout][RetrySettings::total_timeout],
/// - `cancel` is cancelled.
pub async fn run_with_retries<T, E, F, Fut>(
    settings: &RetrySettings,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, RetryHelperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    let start = tokio::time::Instant::now();
    let mut attempts = 0_u32;
    loop {
        if cancel.is_cancelled() {
            return Err(interrupted(attempts));
        }
        attempts += 1;
        let error: BoxError = match op().await {
            Ok(v) => return Ok(v),
            Err(e) => e.into(),
        };
        let retryable = error
            .downcast_ref::<ServiceError>()
            .is_some_and(ServiceError::retryable);
        if !retryable {
            tracing::debug!(attempt = attempts, "permanent error, not retrying: {error}");
            return Err(RetryHelperError::Exhausted {
                attempts,
                source: error,
            });
        }
        if attempts >= settings.max_attempts {
            tracing::warn!(
                attempt = attempts,
                max_attempts = settings.max_attempts,
                "retry loop exhausted: {error}"
            );
            return Err(RetryHelperError::Exhausted {
                attempts,
                source: error,
            });
        }
        let delay = settings.backoff.on_failure(attempts);
        let elapsed = start.elapsed();
        if settings
            .total_timeout
            .is_some_and(|timeout| elapsed + delay > timeout)
        {
            tracing::warn!(
                attempt = attempts,
                elapsed_ms = elapsed.as_millis(),
                "retry loop timed out: {error}"
            );
            return Err(RetryHelperError::Exhausted {
                attempts,
                source: error,
            });
        }
        tracing::debug!(
            attempt = attempts,
            elapsed_ms = elapsed.as_millis(),
            delay_ms = delay.as_millis(),
            "transient error, retrying: {error}"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(interrupted(attempts)),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn interrupted(attempts: u32) -> RetryHelperError {
    tracing::warn!(attempt = attempts, "retry loop interrupted");
    RetryHelperError::Interrupted(RetryInterrupted { attempts })
}

/// Recovers the [ServiceError] that stopped a retry loop.
///
/// If the last attempt failed with a [ServiceError] that exact value is
/// returned, including its [cause][ServiceError::cause]. Interruptions are
/// returned as [Propagation::Interrupted]. Any other error is returned
/// unchanged.
pub fn translate_and_propagate(error: RetryHelperError) -> Propagation {
    match error {
        RetryHelperError::Interrupted(e) => Propagation::Interrupted(e),
        RetryHelperError::Exhausted { attempts, source } => {
            match source.downcast::<ServiceError>() {
                Ok(e) => Propagation::Reclassified(*e),
                Err(source) => {
                    Propagation::Unchanged(RetryHelperError::Exhausted { attempts, source })
                }
            }
        }
    }
}
