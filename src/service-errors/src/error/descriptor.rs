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
use std::collections::HashSet;

/// The code used when the failure carries no structured information.
pub const UNKNOWN_CODE: i32 = 0;

/// The `(code, reason)` pair extracted from a failure.
///
/// The classifier extracts a descriptor from each failure and matches it
/// against the [RetryRules] of the service.
///
/// Equality and hashing only consider the code and the reason.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct ErrorDescriptor {
    /// The transport or status code, [UNKNOWN_CODE] if not available.
    pub code: i32,

    /// The service-specific reason, e.g. `rateLimitExceeded`.
    pub reason: Option<String>,

    /// If `true`, the server certainly did not process the request.
    pub rejected: bool,
}

impl ErrorDescriptor {
    /// Creates a descriptor with the given code and no reason.
    pub fn new(code: i32) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    /// Sets the value for [reason][ErrorDescriptor::reason].
    pub fn set_reason<T: Into<String>>(mut self, v: T) -> Self {
        self.reason = Some(v.into());
        self
    }

    /// Sets or clears the value for [reason][ErrorDescriptor::reason].
    pub fn set_or_clear_reason<T: Into<String>>(mut self, v: Option<T>) -> Self {
        self.reason = v.map(Into::into);
        self
    }

    /// Sets the value for [rejected][ErrorDescriptor::rejected].
    pub fn set_rejected(mut self, v: bool) -> Self {
        self.rejected = v;
        self
    }

    /// Returns `true` if it is safe to retry the operation that failed with
    /// this descriptor.
    ///
    /// The operation is retryable when at least one rule matches the
    /// descriptor, and either the operation is idempotent or the matching
    /// rule says the server rejected the request. The result does not depend
    /// on the order of the rules.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_service_errors::error::*;
    /// let rules = RetryRules::from_iter([RetryRule::new().set_code(429).set_rejected(true)]);
    /// let descriptor = ErrorDescriptor::new(429).set_reason("rateLimitExceeded");
    /// assert!(descriptor.is_retryable(false, &rules));
    /// let descriptor = ErrorDescriptor::new(500).set_reason("internalError");
    /// assert!(!descriptor.is_retryable(true, &rules));
    /// ```
    pub fn is_retryable(&self, idempotent: bool, rules: &RetryRules) -> bool {
        rules
            .iter()
            .any(|rule| rule.matches(self) && (idempotent || rule.rejected))
    }
}

impl PartialEq for ErrorDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.reason == other.reason
    }
}

impl Eq for ErrorDescriptor {}

impl std::hash::Hash for ErrorDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code.hash(state);
        self.reason.hash(state);
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "code={}, reason={reason}", self.code),
            None => write!(f, "code={}", self.code),
        }
    }
}

/// A rule describing a class of retryable errors.
///
/// A rule matches an [ErrorDescriptor] when the rule's code is absent or
/// equal to the descriptor's code, and the rule's reason is absent or equal
/// to the descriptor's reason.
///
/// # Example
/// ```
/// # use google_cloud_service_errors::error::*;
/// let rule = RetryRule::new().set_reason("backendError");
/// assert!(rule.matches(&ErrorDescriptor::new(500).set_reason("backendError")));
/// assert!(rule.matches(&ErrorDescriptor::new(503).set_reason("backendError")));
/// assert!(!rule.matches(&ErrorDescriptor::new(503)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct RetryRule {
    /// The code to match, any code if `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    /// The reason to match, any reason if `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// If `true`, errors matching this rule were certainly not processed by
    /// the server. Such errors are retryable even for non-idempotent
    /// operations. For example, a "rate limit exceeded" error.
    pub rejected: bool,
}

impl RetryRule {
    /// Creates a rule that matches any error, but only for idempotent
    /// operations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for [code][RetryRule::code].
    pub fn set_code<T: Into<i32>>(mut self, v: T) -> Self {
        self.code = Some(v.into());
        self
    }

    /// Sets the value for [reason][RetryRule::reason].
    pub fn set_reason<T: Into<String>>(mut self, v: T) -> Self {
        self.reason = Some(v.into());
        self
    }

    /// Sets the value for [rejected][RetryRule::rejected].
    pub fn set_rejected(mut self, v: bool) -> Self {
        self.rejected = v;
        self
    }

    /// Returns `true` if the rule applies to `descriptor`.
    pub fn matches(&self, descriptor: &ErrorDescriptor) -> bool {
        self.code.is_none_or(|c| c == descriptor.code)
            && self
                .reason
                .as_ref()
                .is_none_or(|r| descriptor.reason.as_ref() == Some(r))
    }
}

/// The set of retryable error rules for a service.
///
/// Services define which errors are retryable as data. Applications can
/// build the rules in code, or load them from configuration:
///
/// ```
/// # use google_cloud_service_errors::error::*;
/// let rules: RetryRules = serde_json::from_str(r#"[
///     {"code": 429, "rejected": true},
///     {"reason": "backendError"}
/// ]"#)?;
/// assert_eq!(rules.len(), 2);
/// # Ok::<(), serde_json::Error>(())
/// ```
///
/// The default value is the empty set: no errors are retryable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RetryRules(HashSet<RetryRule>);

impl RetryRules {
    /// Returns a new set including `rule`.
    pub fn with_rule(mut self, rule: RetryRule) -> Self {
        self.0.insert(rule);
        self
    }

    /// Iterates over the rules, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &RetryRule> {
        self.0.iter()
    }

    /// The number of rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<RetryRule> for RetryRules {
    fn from_iter<I: IntoIterator<Item = RetryRule>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RetryRules {
    type Item = &'a RetryRule;
    type IntoIter = std::collections::hash_set::Iter<'a, RetryRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
