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

//! Verify the classifier through its public API, using payloads in the
//! format returned by JSON-based services.

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use google_cloud_service_errors::classifier::{ErrorClassifier, Failure};
    use google_cloud_service_errors::error::rpc::{Code, RpcStatus};
    use google_cloud_service_errors::error::*;
    use http::HeaderMap;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::io::ErrorKind;
    use test_case::test_case;

    type Result = anyhow::Result<()>;

    static_assertions::assert_impl_all!(ErrorClassifier: Clone, Send, Sync);
    static_assertions::assert_impl_all!(ServiceError: Clone, Send, Sync, std::error::Error);

    fn rules() -> RetryRules {
        serde_json::from_value(json!([
            {"code": 429, "rejected": true},
            {"code": 500, "reason": "backendError"},
            {"code": 503},
        ]))
        .expect("hard-coded rules are valid")
    }

    fn response(status: u16, body: serde_json::Value) -> HttpError {
        HttpError::new(status, HeaderMap::new(), Some(Bytes::from(body.to_string())))
    }

    fn hash(e: &ServiceError) -> u64 {
        let mut hasher = DefaultHasher::new();
        e.hash(&mut hasher);
        hasher.finish()
    }

    #[test_case(json!([{"reason": "invalid"}, {"reason": "required"}]); "two items")]
    #[test_case(json!([{"reason": "invalid"}, {"location": "name", "debugInfo": "x"}]); "second item with extra fields")]
    #[test_case(json!([{"reason": "invalid"}]); "one item")]
    fn reason_from_first_item(errors: serde_json::Value) -> Result {
        let classifier = ErrorClassifier::new(rules());
        let payload = serde_json::from_value::<JsonError>(
            json!({"code": 400, "message": "bad", "errors": errors}),
        )?;
        let got = classifier.classify_payload(&payload, true);
        assert_eq!(got.reason(), Some("invalid"));
        assert_eq!(got.location(), None);
        assert_eq!(got.debug_info(), None);
        Ok(())
    }

    #[test_case(json!({"code": 400, "message": "bad"}); "absent")]
    #[test_case(json!({"code": 400, "message": "bad", "errors": []}); "empty")]
    fn payload_without_items(input: serde_json::Value) -> Result {
        let classifier = ErrorClassifier::new(rules());
        let payload = serde_json::from_value::<JsonError>(input)?;
        let got = classifier.classify_payload(&payload, true);
        assert_eq!(got.code(), 400);
        assert_eq!(got.reason(), None);
        assert_eq!(got.location(), None);
        assert_eq!(got.debug_info(), None);
        Ok(())
    }

    #[test_case(ErrorKind::TimedOut)]
    #[test_case(ErrorKind::ConnectionReset)]
    #[test_case(ErrorKind::ConnectionAborted)]
    #[test_case(ErrorKind::BrokenPipe)]
    #[test_case(ErrorKind::Other)]
    fn transport_fault_not_idempotent(kind: ErrorKind) {
        let classifier = ErrorClassifier::new(rules());
        let got = classifier.classify_io(std::io::Error::from(kind), false);
        assert!(!got.retryable(), "{got:?}");
        assert!(!got.idempotent(), "{got:?}");
        let got = classifier.classify_io(std::io::Error::other(INSUFFICIENT_DATA_WRITTEN), false);
        assert!(!got.retryable(), "{got:?}");
    }

    #[test]
    fn transport_fault_idempotent() {
        let classifier = ErrorClassifier::new(rules());
        let got = classifier.classify_io(std::io::Error::from(ErrorKind::TimedOut), true);
        assert!(got.retryable(), "{got:?}");
        let got = classifier.classify_io(std::io::Error::other(INSUFFICIENT_DATA_WRITTEN), true);
        assert!(got.retryable(), "{got:?}");
        let got = classifier.classify_io(std::io::Error::other("certificate expired"), true);
        assert!(!got.retryable(), "{got:?}");
        assert_eq!(got.code(), UNKNOWN_CODE);
    }

    #[test]
    fn rejected_rule() {
        let rules = RetryRules::from_iter([RetryRule::new().set_code(429).set_rejected(true)]);
        let descriptor = ErrorDescriptor::new(429).set_reason("rateLimitExceeded");
        assert!(descriptor.is_retryable(false, &rules));
        let descriptor = ErrorDescriptor::new(500).set_reason("internalError");
        assert!(!descriptor.is_retryable(false, &rules));
        assert!(!descriptor.is_retryable(true, &rules));
    }

    #[test]
    fn equality_and_hash() {
        let classifier = ErrorClassifier::new(rules());
        let cause = Cause::new(std::io::Error::other("boom"));
        let make = |code: i32, message: &str| {
            classifier.classify_code_with_cause(
                code,
                message,
                Some("backendError"),
                true,
                cause.clone(),
            )
        };
        let a = make(500, "internal");
        let b = make(500, "internal");
        assert_eq!(a, b);
        assert_eq!(hash(&a), hash(&b));

        assert_ne!(a, make(503, "internal"));
        assert_ne!(a, make(500, "other message"));
        let other_cause = classifier.classify_code_with_cause(
            500,
            "internal",
            Some("backendError"),
            true,
            Cause::new(std::io::Error::other("boom")),
        );
        assert_ne!(a, other_cause);
        let not_idempotent = classifier.classify_code_with_cause(
            500,
            "internal",
            Some("backendError"),
            false,
            cause.clone(),
        );
        assert_ne!(a, not_idempotent);
    }

    #[test]
    fn http_payload_with_details() {
        let classifier = ErrorClassifier::new(rules());
        let error = response(
            429,
            json!({"error": {
                "code": 429,
                "message": "Rate Limit Exceeded",
                "errors": [{
                    "domain": "usageLimits",
                    "reason": "rateLimitExceeded",
                    "location": "bucket",
                    "debugInfo": "quota bucket 42",
                }],
            }}),
        );
        let got = classifier.classify(error, false);
        assert_eq!(got.code(), 429);
        assert_eq!(got.message(), "Rate Limit Exceeded");
        assert_eq!(got.reason(), Some("rateLimitExceeded"));
        assert_eq!(got.location(), Some("bucket"));
        assert_eq!(got.debug_info(), Some("quota bucket 42"));
        assert!(got.retryable(), "{got:?}");
        assert!(!got.idempotent(), "{got:?}");
        let source = std::error::Error::source(&got)
            .and_then(|e| e.downcast_ref::<HttpError>())
            .map(HttpError::status_code);
        assert_eq!(source, Some(429));
    }

    #[test]
    fn http_payload_without_details() {
        let classifier = ErrorClassifier::new(rules());
        let error = HttpError::new(
            503,
            HeaderMap::new(),
            Some(Bytes::from_static(b"Service Unavailable")),
        );
        let got = classifier.classify(error, true);
        assert_eq!(got.code(), 503);
        assert_eq!(got.reason(), None);
        assert!(got.message().contains("Service Unavailable"), "{got:?}");
        assert!(!got.retryable(), "{got:?}");
    }

    #[test_case(Code::Unavailable, true)]
    #[test_case(Code::Internal, false)]
    #[test_case(Code::ResourceExhausted, true)]
    fn rpc_status(code: Code, retryable: bool) {
        let classifier = ErrorClassifier::default();
        let status = RpcStatus::new(code, "rpc failed").set_retryable(retryable);
        let got = classifier.classify(status, false);
        assert_eq!(got.code(), code.value());
        assert_eq!(got.reason(), Some(code.name()));
        assert_eq!(got.retryable(), retryable, "{got:?}");
    }

    #[test]
    fn synthesized() {
        let classifier = ErrorClassifier::new(rules());
        let got = classifier.classify(
            Failure::Code {
                code: 500,
                message: "backend failed".to_string(),
                reason: Some("backendError".to_string()),
            },
            true,
        );
        assert!(got.retryable(), "{got:?}");
        assert_eq!(got.to_string(), "the service reports an error with code 500 described as: backend failed, reason=backendError");
    }

    #[test]
    fn shared_across_threads() -> Result {
        let classifier = ErrorClassifier::new(rules());
        let handles = (0..4)
            .map(|_| {
                let classifier = classifier.clone();
                std::thread::spawn(move || classifier.classify_code(503, "busy", None, true))
            })
            .collect::<Vec<_>>();
        for h in handles {
            let got = h.join().map_err(|_| anyhow::anyhow!("thread panicked"))?;
            assert!(got.retryable(), "{got:?}");
        }
        Ok(())
    }
}
