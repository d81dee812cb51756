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

use std::error::Error as StdError;
use std::sync::Arc;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The normalized error for a failed call to a service.
///
/// Services report errors in many shapes: JSON payloads, HTTP responses
/// without a payload, I/O faults, and RPC statuses. The
/// [ErrorClassifier][crate::classifier::ErrorClassifier] converts all of them
/// to this type. Applications can query the error code, reason, and location
/// reported by the service, and whether it is safe to retry the operation.
///
/// Instances are immutable. In particular, the retry verdict is computed when
/// the error is created and never changes.
///
/// Two errors are equal if all their fields are equal. The [cause][Self::cause]
/// compares by identity.
///
/// # Example
/// ```
/// use google_cloud_service_errors::classifier::ErrorClassifier;
/// use google_cloud_service_errors::error::ServiceError;
///
/// fn handle(e: ServiceError) {
///     if e.retryable() {
///         println!("transient error {e}, consider trying again");
///     } else if let Some(location) = e.location() {
///         println!("the service rejected the request, check {location}: {e}");
///     }
/// }
/// let classifier = ErrorClassifier::default();
/// handle(classifier.classify_code(404, "NOT FOUND", Some("notFound"), true));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServiceError {
    code: i32,
    message: String,
    reason: Option<String>,
    retryable: bool,
    idempotent: bool,
    location: Option<String>,
    debug_info: Option<String>,
    cause: Option<Cause>,
}

impl ServiceError {
    pub(crate) fn new(code: i32, message: String, retryable: bool, idempotent: bool) -> Self {
        Self {
            code,
            message,
            reason: None,
            retryable,
            idempotent,
            location: None,
            debug_info: None,
            cause: None,
        }
    }

    pub(crate) fn with_reason(mut self, v: Option<String>) -> Self {
        self.reason = v;
        self
    }

    pub(crate) fn with_location(mut self, v: Option<String>) -> Self {
        self.location = v;
        self
    }

    pub(crate) fn with_debug_info(mut self, v: Option<String>) -> Self {
        self.debug_info = v;
        self
    }

    pub(crate) fn with_cause(mut self, v: Option<Cause>) -> Self {
        self.cause = v;
        self
    }

    /// The code associated with this error.
    ///
    /// For errors received from a service this is the code in the error
    /// payload, or the HTTP status code if there was no payload. For errors
    /// reported by an RPC layer, this is the numeric value of the status code.
    /// The value is [UNKNOWN_CODE][super::UNKNOWN_CODE] for errors without any
    /// structured information, such as I/O faults.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The human-readable description of the error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The reason that caused the error, e.g. `rateLimitExceeded`.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns `true` when it is safe to retry the operation that caused this
    /// error.
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Returns `true` when the operation that caused this error had no side
    /// effects.
    pub fn idempotent(&self) -> bool {
        self.idempotent
    }

    /// The location in the request where the service detected the error, if
    /// the service reported one.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Implementation diagnostics reported by the service.
    ///
    /// These are intended for troubleshooting with the service support team.
    /// Their format is undocumented and may change at any time.
    pub fn debug_info(&self) -> Option<&str> {
        self.debug_info.as_deref()
    }

    /// The underlying failure, if any.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "the service reports an error with code {} described as: {}",
            self.code, self.message
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ", reason={reason}")?;
        }
        if let Some(location) = &self.location {
            write!(f, ", location={location}")?;
        }
        Ok(())
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|c| c.0.as_ref() as &(dyn StdError + 'static))
    }
}

/// The failure that caused a [ServiceError].
///
/// Causes are shared, cloning a [ServiceError] does not clone the
/// underlying failure. Two causes are equal only if they refer to the same
/// failure.
#[derive(Clone)]
pub struct Cause(Arc<dyn StdError + Send + Sync>);

impl Cause {
    /// Wraps `source` in a new cause.
    pub fn new<T: StdError + Send + Sync + 'static>(source: T) -> Self {
        Self(Arc::new(source))
    }

    /// Returns the underlying failure.
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }

    /// Returns the underlying failure if it is of type `T`.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl From<BoxError> for Cause {
    fn from(value: BoxError) -> Self {
        Self(Arc::from(value))
    }
}

impl From<Arc<dyn StdError + Send + Sync>> for Cause {
    fn from(value: Arc<dyn StdError + Send + Sync>) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Cause {}

impl std::hash::Hash for Cause {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).cast::<()>().hash(state);
    }
}
