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

use super::JsonError;
use bytes::Bytes;
use http::HeaderMap;
use std::io::ErrorKind;

/// The message some HTTP transports use when the connection closes before the
/// full request body is written.
///
/// Faults with this exact message are treated like a connection reset.
pub const INSUFFICIENT_DATA_WRITTEN: &str = "insufficient data written";

/// An error describing a non-2xx HTTP response.
///
/// The transport received a response, but the response may or may not
/// include a [JsonError] payload.
#[derive(Clone, Debug, Default)]
pub struct HttpError {
    status_code: u16,
    headers: HeaderMap,
    payload: Option<Bytes>,
}

impl HttpError {
    /// Creates a new [HttpError] with the given status code, headers, and payload.
    pub fn new(status_code: u16, headers: HeaderMap, payload: Option<Bytes>) -> Self {
        Self {
            status_code,
            headers,
            payload,
        }
    }

    /// Returns the status code associated with the HTTP error response.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Returns the headers associated with the HTTP error response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the payload associated with the HTTP error response.
    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// The structured error in the payload, if the payload contains one.
    pub fn details(&self) -> Option<JsonError> {
        self.payload
            .as_ref()
            .and_then(|p| JsonError::try_from(p).ok())
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "the HTTP transport reports a [{}] error", self.status_code)?;
        match self.payload.as_ref().map(|p| std::str::from_utf8(p.as_ref())) {
            Some(Ok(message)) => write!(f, ": {message}"),
            Some(Err(_)) => write!(f, ": {:?}", self.payload),
            None => Ok(()),
        }
    }
}

impl std::error::Error for HttpError {}

/// Returns `true` if a transport fault may be retried.
///
/// Only idempotent operations are retried on transport faults: without a
/// response the client cannot prove the request was not applied. For
/// idempotent operations, timeouts, connection resets and aborts are
/// retryable, as are faults with the [INSUFFICIENT_DATA_WRITTEN] message.
///
/// # Example
/// ```
/// # use google_cloud_service_errors::error::*;
/// use std::io::{Error, ErrorKind};
/// assert!(is_retryable_io(true, &Error::from(ErrorKind::TimedOut)));
/// assert!(!is_retryable_io(false, &Error::from(ErrorKind::TimedOut)));
/// assert!(is_retryable_io(true, &Error::other(INSUFFICIENT_DATA_WRITTEN)));
/// assert!(!is_retryable_io(true, &Error::other("bad certificate")));
/// ```
pub fn is_retryable_io(idempotent: bool, fault: &std::io::Error) -> bool {
    let message = fault.get_ref().map(|e| e.to_string());
    transport_verdict(idempotent, Some(fault.kind()), message.as_deref())
}

pub(crate) fn transport_verdict(
    idempotent: bool,
    kind: Option<ErrorKind>,
    message: Option<&str>,
) -> bool {
    let retryable_kind = matches!(
        kind,
        Some(ErrorKind::TimedOut | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted)
    );
    idempotent && (retryable_kind || message == Some(INSUFFICIENT_DATA_WRITTEN))
}
