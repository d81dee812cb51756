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

//! Service error classification.
//!
//! This crate normalizes the failures of remote calls into a single error
//! type, [ServiceError][error::ServiceError]. The failures may come from
//! several sources: a structured JSON error payload, an HTTP response, a raw
//! I/O fault, or a status already classified by an RPC layer. Regardless of
//! the source, applications see the same accessors (`code()`, `reason()`,
//! `retryable()`, `idempotent()`, `location()`) and a single signal to decide
//! if the failed operation may be attempted again.
//!
//! Each service supplies its own [RetryRules][error::RetryRules]. The
//! [ErrorClassifier][classifier::ErrorClassifier] combines these rules with
//! the idempotency of the failed operation to compute the retry verdict.
//!
//! # Example
//! ```
//! use google_cloud_service_errors::classifier::ErrorClassifier;
//! use google_cloud_service_errors::error::{RetryRule, RetryRules};
//!
//! let rules = RetryRules::from_iter([
//!     RetryRule::new().set_code(429).set_rejected(true),
//!     RetryRule::new().set_code(503),
//! ]);
//! let classifier = ErrorClassifier::new(rules);
//!
//! let error = classifier.classify_code(429, "slow down", Some("rateLimitExceeded"), false);
//! assert!(error.retryable());
//! let error = classifier.classify_code(503, "try again", None, false);
//! assert!(!error.retryable());
//! ```

/// An alias of [std::result::Result] where the error is always [ServiceError][crate::error::ServiceError].
pub type Result<T> = std::result::Result<T, crate::error::ServiceError>;

/// The normalized error type and the data used to classify it.
pub mod error;

pub mod classifier;
pub mod exponential_backoff;
pub mod retry_helper;
