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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The key used by services to report implementation diagnostics in an
/// [ErrorItem].
pub const DEBUG_INFO_KEY: &str = "debugInfo";

/// The error payload returned by JSON-based services.
///
/// Services return this message wrapped in an `{"error": ...}` object. Use
/// [JsonError::try_from] to parse the body of an HTTP response.
///
/// # Example
/// ```
/// # use google_cloud_service_errors::error::JsonError;
/// let body = bytes::Bytes::from_static(br#"{"error": {
///     "code": 403,
///     "message": "Rate Limit Exceeded",
///     "errors": [{"reason": "rateLimitExceeded", "domain": "usageLimits"}]
/// }}"#);
/// let error = JsonError::try_from(&body)?;
/// assert_eq!(error.code, 403);
/// assert_eq!(error.reason(), Some("rateLimitExceeded"));
/// # Ok::<(), google_cloud_service_errors::error::PayloadError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct JsonError {
    /// The top-level code, typically the HTTP status code.
    pub code: i32,

    /// A developer-facing error message.
    pub message: String,

    /// The detailed errors, may be absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorItem>>,
}

impl JsonError {
    /// Sets the value for [code][JsonError::code].
    pub fn set_code<T: Into<i32>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][JsonError::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value for [errors][JsonError::errors].
    pub fn set_errors<T, I>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: Into<ErrorItem>,
    {
        self.errors = Some(v.into_iter().map(Into::into).collect());
        self
    }

    /// The first detailed error, if any.
    ///
    /// Responses with multiple errors are summarized by their first error.
    pub fn first_item(&self) -> Option<&ErrorItem> {
        self.errors.as_ref().and_then(|v| v.first())
    }

    /// The reason of the first detailed error, if any.
    pub fn reason(&self) -> Option<&str> {
        self.first_item().and_then(|e| e.reason.as_deref())
    }
}

/// A single entry in [JsonError::errors].
///
/// Services may include fields beyond the reason and location. These are
/// preserved in [extra][ErrorItem::extra].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ErrorItem {
    /// The service-specific reason for the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// The location in the request that caused the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Any other fields in the error entry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for [reason][ErrorItem::reason].
    pub fn set_reason<T: Into<String>>(mut self, v: T) -> Self {
        self.reason = Some(v.into());
        self
    }

    /// Sets the value for [location][ErrorItem::location].
    pub fn set_location<T: Into<String>>(mut self, v: T) -> Self {
        self.location = Some(v.into());
        self
    }

    /// Inserts a value in [extra][ErrorItem::extra].
    pub fn set_extra<K: Into<String>, V: Into<Value>>(mut self, k: K, v: V) -> Self {
        self.extra.insert(k.into(), v.into());
        self
    }

    /// Sets the implementation diagnostics for this entry.
    pub fn set_debug_info<T: Into<String>>(self, v: T) -> Self {
        self.set_extra(DEBUG_INFO_KEY, v.into())
    }

    /// The implementation diagnostics, if the service included them.
    pub fn debug_info(&self) -> Option<&str> {
        self.extra.get(DEBUG_INFO_KEY).and_then(Value::as_str)
    }
}

/// The error returned when an HTTP payload does not contain a [JsonError].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("the payload is not a JSON error response: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: JsonError,
}

impl TryFrom<&bytes::Bytes> for JsonError {
    type Error = PayloadError;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        let wrapper = serde_json::from_slice::<ErrorWrapper>(value)?;
        Ok(wrapper.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    // A payload in the format returned by JSON-based services.
    const SAMPLE_PAYLOAD: &[u8] = b"{\n  \"error\": {\n    \"code\": 400,\n    \"message\": \"Invalid value for field 'projectId'\",\n    \"errors\": [\n      {\n        \"domain\": \"global\",\n        \"reason\": \"invalid\",\n        \"message\": \"Invalid value for field 'projectId'\",\n        \"location\": \"projectId\",\n        \"locationType\": \"parameter\",\n        \"debugInfo\": \"backend trace 1234\"\n      }\n    ]\n  }\n}\n";

    #[test]
    fn try_from_bytes() -> Result<()> {
        let got = JsonError::try_from(&bytes::Bytes::from_static(SAMPLE_PAYLOAD))?;
        assert_eq!(got.code, 400);
        assert_eq!(got.message, "Invalid value for field 'projectId'");
        assert_eq!(got.reason(), Some("invalid"));
        let item = got.first_item().unwrap();
        assert_eq!(item.location.as_deref(), Some("projectId"));
        assert_eq!(item.debug_info(), Some("backend trace 1234"));
        assert_eq!(item.extra.get("domain"), Some(&json!("global")));
        Ok(())
    }

    #[test]
    fn try_from_bytes_errors() {
        let got = JsonError::try_from(&bytes::Bytes::from_static(b"not json"));
        assert!(matches!(got, Err(PayloadError::Parse(_))), "{got:?}");

        let got = JsonError::try_from(&bytes::Bytes::from_static(b"{\"missing-error\": 1}"));
        assert!(matches!(got, Err(PayloadError::Parse(_))), "{got:?}");
    }

    #[test]
    fn missing_errors() -> Result<()> {
        let got = serde_json::from_value::<JsonError>(json!({"code": 503, "message": "m"}))?;
        assert_eq!(got.errors, None);
        assert_eq!(got.first_item(), None);
        assert_eq!(got.reason(), None);

        let got = JsonError::default().set_code(503).set_errors(Vec::<ErrorItem>::new());
        assert_eq!(got.reason(), None);
        Ok(())
    }

    #[test]
    fn reason_from_first_item_only() {
        let got = JsonError::default().set_code(403).set_errors([
            ErrorItem::new().set_reason("rateLimitExceeded"),
            ErrorItem::new().set_reason("quotaExceeded"),
        ]);
        assert_eq!(got.reason(), Some("rateLimitExceeded"));

        let got = JsonError::default().set_code(403).set_errors([
            ErrorItem::new().set_location("name"),
            ErrorItem::new().set_reason("quotaExceeded"),
        ]);
        assert_eq!(got.reason(), None);
    }

    #[test]
    fn debug_info_is_not_a_string() {
        let item = ErrorItem::new().set_extra(DEBUG_INFO_KEY, 42);
        assert_eq!(item.debug_info(), None);
        let item = ErrorItem::new().set_debug_info("details");
        assert_eq!(item.debug_info(), Some("details"));
    }

    #[test]
    fn serialize() -> Result<()> {
        let input = JsonError::default()
            .set_code(404)
            .set_message("not found")
            .set_errors([ErrorItem::new()
                .set_reason("notFound")
                .set_location("name")
                .set_debug_info("trace")]);
        let got = serde_json::to_value(&input)?;
        let want = json!({
            "code": 404,
            "message": "not found",
            "errors": [{"reason": "notFound", "location": "name", "debugInfo": "trace"}],
        });
        assert_eq!(got, want);
        Ok(())
    }
}
