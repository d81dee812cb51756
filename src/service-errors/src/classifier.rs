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

//! Converts the failures of remote calls into [ServiceError] values.
//!
//! The [ErrorClassifier] accepts several failure shapes:
//!
//! - a structured [JsonError] payload,
//! - an [HttpError], with or without a structured payload,
//! - a raw I/O fault,
//! - an [RpcStatus] already classified by the RPC layer,
//! - a `(code, reason)` pair provided by the calling layer.
//!
//! Classification is a pure computation. It performs no I/O, and it never
//! fails: in the worst case the error has an [UNKNOWN_CODE] and no reason.

use crate::error::rpc::RpcStatus;
use crate::error::{
    Cause, ErrorDescriptor, HttpError, JsonError, RetryRules, ServiceError, UNKNOWN_CODE,
    is_retryable_io, transport_verdict,
};
use std::sync::Arc;

/// The failures accepted by [ErrorClassifier::classify].
#[derive(Debug)]
#[non_exhaustive]
pub enum Failure {
    /// A structured error payload returned by the service.
    Payload(JsonError),
    /// An HTTP response with an error status.
    Http(HttpError),
    /// A transport fault without any response.
    Io(std::io::Error),
    /// A status classified by the RPC layer.
    Rpc(RpcStatus),
    /// An error synthesized by the calling layer.
    Code {
        code: i32,
        message: String,
        reason: Option<String>,
    },
}

impl From<JsonError> for Failure {
    fn from(value: JsonError) -> Self {
        Self::Payload(value)
    }
}

impl From<HttpError> for Failure {
    fn from(value: HttpError) -> Self {
        Self::Http(value)
    }
}

impl From<std::io::Error> for Failure {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RpcStatus> for Failure {
    fn from(value: RpcStatus) -> Self {
        Self::Rpc(value)
    }
}

/// Classifies failures using the retry rules of a service.
///
/// Each service provides its own [RetryRules]. The classifier shares them,
/// so cloning a classifier is cheap, and the classifier can be used from
/// many tasks at once.
///
/// # Example
/// ```
/// # use google_cloud_service_errors::classifier::ErrorClassifier;
/// # use google_cloud_service_errors::error::*;
/// let classifier = ErrorClassifier::new(RetryRules::from_iter([
///     RetryRule::new().set_code(429).set_rejected(true),
/// ]));
/// let payload = JsonError::default()
///     .set_code(429)
///     .set_message("Rate Limit Exceeded")
///     .set_errors([ErrorItem::new().set_reason("rateLimitExceeded")]);
/// let error = classifier.classify_payload(&payload, false);
/// assert_eq!(error.reason(), Some("rateLimitExceeded"));
/// assert!(error.retryable());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ErrorClassifier {
    rules: Arc<RetryRules>,
}

impl ErrorClassifier {
    /// Creates a classifier using `rules` to compute the retry verdict.
    pub fn new(rules: RetryRules) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    /// The retry rules used by this classifier.
    pub fn rules(&self) -> &RetryRules {
        &self.rules
    }

    /// Classifies any supported failure.
    ///
    /// # Parameters
    /// * `failure` - the failure observed by the caller.
    /// * `idempotent` - if `true`, the failed operation has no side effects
    ///   and can be safely repeated.
    pub fn classify<F: Into<Failure>>(&self, failure: F, idempotent: bool) -> ServiceError {
        match failure.into() {
            Failure::Payload(p) => self.classify_payload(&p, idempotent),
            Failure::Http(e) => self.classify_http(e, idempotent),
            Failure::Io(e) => self.classify_io(e, idempotent),
            Failure::Rpc(s) => self.classify_rpc(s, idempotent),
            Failure::Code {
                code,
                message,
                reason,
            } => self.classify_code(code, message, reason.as_deref(), idempotent),
        }
    }

    /// Classifies a structured error payload.
    ///
    /// The reason, location, and debug info come from the first entry in
    /// [JsonError::errors]. The location and debug info are only used if the
    /// first entry has a reason.
    pub fn classify_payload(&self, payload: &JsonError, idempotent: bool) -> ServiceError {
        let error = self.from_payload(payload, idempotent);
        trace_classification(&error, "payload");
        error
    }

    /// Classifies an HTTP error response.
    ///
    /// If the response payload contains a [JsonError] the error is classified
    /// as in [classify_payload][Self::classify_payload]. Otherwise the code
    /// is the HTTP status code, and the error is classified as a transport
    /// fault.
    pub fn classify_http(&self, error: HttpError, idempotent: bool) -> ServiceError {
        let base = match error.details() {
            Some(details) => self.from_payload(&details, idempotent),
            None => {
                let message = error.to_string();
                let retryable = transport_verdict(idempotent, None, Some(&message));
                ServiceError::new(error.status_code() as i32, message, retryable, idempotent)
            }
        };
        let classified = base.with_cause(Some(Cause::new(error)));
        trace_classification(&classified, "http");
        classified
    }

    /// Classifies a transport fault received before any response.
    ///
    /// Such errors have an [UNKNOWN_CODE]. They are retryable only if the
    /// operation is idempotent and the fault is one of the kinds accepted by
    /// [is_retryable_io].
    pub fn classify_io(&self, fault: std::io::Error, idempotent: bool) -> ServiceError {
        let retryable = is_retryable_io(idempotent, &fault);
        let error = ServiceError::new(UNKNOWN_CODE, fault.to_string(), retryable, idempotent)
            .with_cause(Some(Cause::new(fault)));
        trace_classification(&error, "io");
        error
    }

    /// Classifies a status reported by an RPC layer.
    ///
    /// The RPC layer already decided if the error is retryable. This function
    /// uses that verdict without applying any rules.
    pub fn classify_rpc(&self, status: RpcStatus, idempotent: bool) -> ServiceError {
        let error = ServiceError::new(
            status.code.value(),
            status.message.clone(),
            status.retryable,
            idempotent,
        )
        .with_reason(Some(status.code.name().to_string()))
        .with_cause(Some(Cause::new(status)));
        trace_classification(&error, "rpc");
        error
    }

    /// Classifies an error synthesized by the calling layer.
    pub fn classify_code<M: Into<String>>(
        &self,
        code: i32,
        message: M,
        reason: Option<&str>,
        idempotent: bool,
    ) -> ServiceError {
        let error = self.from_code(code, message.into(), reason, idempotent);
        trace_classification(&error, "code");
        error
    }

    /// Classifies an error synthesized by the calling layer, preserving the
    /// failure that caused it.
    pub fn classify_code_with_cause<M: Into<String>>(
        &self,
        code: i32,
        message: M,
        reason: Option<&str>,
        idempotent: bool,
        cause: Cause,
    ) -> ServiceError {
        let error = self
            .from_code(code, message.into(), reason, idempotent)
            .with_cause(Some(cause));
        trace_classification(&error, "code");
        error
    }

    fn from_code(
        &self,
        code: i32,
        message: String,
        reason: Option<&str>,
        idempotent: bool,
    ) -> ServiceError {
        let descriptor = ErrorDescriptor::new(code).set_or_clear_reason(reason);
        let retryable = descriptor.is_retryable(idempotent, &self.rules);
        ServiceError::new(code, message, retryable, idempotent).with_reason(descriptor.reason)
    }

    fn from_payload(&self, payload: &JsonError, idempotent: bool) -> ServiceError {
        let descriptor = ErrorDescriptor::new(payload.code).set_or_clear_reason(payload.reason());
        let retryable = descriptor.is_retryable(idempotent, &self.rules);
        let (location, debug_info) = match (&descriptor.reason, payload.first_item()) {
            (Some(_), Some(item)) => (
                item.location.clone(),
                item.debug_info().map(str::to_string),
            ),
            _ => (None, None),
        };
        ServiceError::new(
            descriptor.code,
            payload.message.clone(),
            retryable,
            idempotent,
        )
        .with_reason(descriptor.reason)
        .with_location(location)
        .with_debug_info(debug_info)
    }
}

fn trace_classification(error: &ServiceError, source: &'static str) {
    tracing::debug!(
        source,
        code = error.code(),
        reason = error.reason(),
        retryable = error.retryable(),
        idempotent = error.idempotent(),
        "classified service error"
    );
}
