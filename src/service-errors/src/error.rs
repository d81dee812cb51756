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

mod descriptor;
mod payload;
mod service_error;
mod transport;
pub use descriptor::*;
pub use payload::*;
pub use service_error::*;
pub use transport::*;
pub(crate) use transport::transport_verdict;

/// Status values reported by RPC layers.
///
/// RPC clients classify their own failures. The types in this module carry
/// that classification, including the retry verdict, into the
/// [ErrorClassifier][crate::classifier::ErrorClassifier].
///
/// # Examples
///
/// ```
/// # use google_cloud_service_errors::error;
/// use error::rpc::{Code, RpcStatus};
/// let status = RpcStatus::new(Code::Unavailable, "try again").set_retryable(true);
/// assert_eq!(status.code.name(), "UNAVAILABLE");
/// ```
pub mod rpc;
