//! Maps pipeline outcomes to HTTP-style responses.
//!
//! The mapper is pure: it holds a read-only [`ResponseConfig`] and turns
//! either an executable output or a [`StageFailure`] into an
//! [`HttpResponse`]. Failure bodies always carry a JSON content type, whatever
//! the success path is configured to emit.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthFailure, ErrorView, ServiceError};
use crate::pipeline::{Stage, StageFailure};
use crate::result::ServiceResult;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const NO_CONTENT_STATUS: u16 = 204;

const FALLBACK_FAILURE_BODY: &str =
    r#"{"message":"failure body could not be serialized","errors":[]}"#;

/// Turns executable output or a stage failure into a transport response.
pub trait ResponseEncoder<O>: Send + Sync {
    type Response: Send;

    fn encode_success(&self, output: &O) -> ServiceResult<Self::Response>;

    /// Must not fail: every request ends in a response.
    fn encode_failure(&self, failure: &StageFailure) -> Self::Response;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolicy {
    pub missing_credential: u16,
    pub verification_failed: u16,
    pub extract: u16,
    pub execution: u16,
    pub encode: u16,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            missing_credential: 401,
            verification_failed: 403,
            extract: 400,
            execution: 500,
            encode: 500,
        }
    }
}

impl StatusPolicy {
    pub fn status_for(&self, stage: Stage) -> u16 {
        match stage {
            Stage::Auth(AuthFailure::MissingCredential) => self.missing_credential,
            Stage::Auth(AuthFailure::VerificationFailed) => self.verification_failed,
            Stage::Extract => self.extract,
            Stage::Execution => self.execution,
            Stage::Encode => self.encode,
        }
    }
}

pub type BodySerializer = Arc<dyn Fn(&Value) -> Result<String, ServiceError> + Send + Sync>;

pub fn json_body_serializer() -> BodySerializer {
    Arc::new(|value: &Value| {
        serde_json::to_string(value)
            .map_err(|error| ServiceError::encode(error.to_string()).with_cause(error))
    })
}

/// Response mapper configuration. Defaults: status 200 (204 for an absent
/// payload), `application/json`, `serde_json` serializer, no base64, and the
/// default [`StatusPolicy`].
#[derive(Clone)]
pub struct ResponseConfig {
    pub success_status: u16,
    pub content_type: String,
    pub body_serializer: BodySerializer,
    pub base64_encode: bool,
    pub status_policy: StatusPolicy,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            success_status: 200,
            content_type: JSON_CONTENT_TYPE.to_string(),
            body_serializer: json_body_serializer(),
            base64_encode: false,
            status_policy: StatusPolicy::default(),
        }
    }
}

impl ResponseConfig {
    pub fn with_success_status(mut self, status: u16) -> Self {
        self.success_status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_body_serializer(mut self, serializer: BodySerializer) -> Self {
        self.body_serializer = serializer;
        self
    }

    pub fn with_base64_encode(mut self, enabled: bool) -> Self {
        self.base64_encode = enabled;
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }
}

impl fmt::Debug for ResponseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseConfig")
            .field("success_status", &self.success_status)
            .field("content_type", &self.content_type)
            .field("base64_encode", &self.base64_encode)
            .field("status_policy", &self.status_policy)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Serialize)]
struct FailureBody<'a> {
    message: &'a str,
    errors: Vec<ErrorView<'a>>,
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponder {
    config: Arc<ResponseConfig>,
}

impl HttpResponder {
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ResponseConfig {
        &self.config
    }

    fn headers(content_type: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(CONTENT_TYPE_HEADER.to_string(), content_type.to_string())])
    }
}

impl<O> ResponseEncoder<O> for HttpResponder
where
    O: Serialize + Sync,
{
    type Response = HttpResponse;

    fn encode_success(&self, output: &O) -> ServiceResult<HttpResponse> {
        let value = serde_json::to_value(output)
            .map_err(|error| ServiceError::encode(error.to_string()).with_cause(error))?;

        let mut response = HttpResponse {
            status_code: self.config.success_status,
            headers: Self::headers(&self.config.content_type),
            body: String::new(),
            is_base64_encoded: self.config.base64_encode,
        };

        if value.is_null() {
            response.status_code = NO_CONTENT_STATUS;
            return Ok(response);
        }

        let body = (self.config.body_serializer)(&value)?;
        response.body = if self.config.base64_encode {
            base64::engine::general_purpose::STANDARD.encode(body)
        } else {
            body
        };
        Ok(response)
    }

    fn encode_failure(&self, failure: &StageFailure) -> HttpResponse {
        let body = FailureBody {
            message: &failure.message,
            errors: failure
                .failure
                .errors()
                .iter()
                .map(ServiceError::view)
                .collect(),
        };

        HttpResponse {
            status_code: self.config.status_policy.status_for(failure.stage),
            headers: Self::headers(JSON_CONTENT_TYPE),
            body: serde_json::to_string(&body)
                .unwrap_or_else(|_| FALLBACK_FAILURE_BODY.to_string()),
            is_base64_encoded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::result::Failure;

    fn encode<O: Serialize + Sync>(responder: &HttpResponder, output: &O) -> HttpResponse {
        ResponseEncoder::<O>::encode_success(responder, output).expect("encoding should succeed")
    }

    fn reject(responder: &HttpResponder, stage: Stage, error: ServiceError) -> HttpResponse {
        let failure = StageFailure::new(stage, "failed", Failure::from(error));
        ResponseEncoder::<()>::encode_failure(responder, &failure)
    }

    #[test]
    fn string_output_is_json_quoted() {
        let response = encode(&HttpResponder::default(), &"client");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "\"client\"");
        assert_eq!(
            response.headers,
            BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())])
        );
        assert!(!response.is_base64_encoded);
    }

    #[test]
    fn absent_output_yields_no_content() {
        let response = encode(&HttpResponder::default(), &Option::<String>::None);

        assert_eq!(response.status_code, 204);
        assert!(response.body.is_empty());
    }

    #[test]
    fn base64_encodes_serialized_body_when_configured() {
        let responder = HttpResponder::new(
            ResponseConfig::default()
                .with_base64_encode(true)
                .with_content_type("text/plain")
                .with_success_status(201),
        );

        let response = encode(&responder, &"client");

        assert_eq!(response.status_code, 201);
        assert_eq!(response.body, "ImNsaWVudCI=");
        assert!(response.is_base64_encoded);
        assert_eq!(response.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn custom_serializer_replaces_json() {
        let serializer: BodySerializer = Arc::new(|value: &Value| {
            Ok::<_, ServiceError>(value.as_str().map(str::to_uppercase).unwrap_or_default())
        });
        let responder =
            HttpResponder::new(ResponseConfig::default().with_body_serializer(serializer));

        assert_eq!(encode(&responder, &"client").body, "CLIENT");
    }

    #[test]
    fn serializer_fault_surfaces_as_encode_error() {
        let serializer: BodySerializer =
            Arc::new(|_: &Value| Err::<String, _>(ServiceError::encode("cannot render")));
        let responder =
            HttpResponder::new(ResponseConfig::default().with_body_serializer(serializer));

        let failure = ResponseEncoder::<&str>::encode_success(&responder, &"client")
            .expect_err("serializer should fail");
        assert_eq!(failure.first().message(), "cannot render");
    }

    #[test]
    fn default_status_policy_covers_every_stage() {
        let responder = HttpResponder::default();
        let cases = [
            (
                Stage::Auth(AuthFailure::MissingCredential),
                ServiceError::missing_credential("x-auth-token header missing"),
                401,
            ),
            (
                Stage::Auth(AuthFailure::VerificationFailed),
                ServiceError::verification_failed("bad tokens"),
                403,
            ),
            (Stage::Extract, ServiceError::extract("bad input"), 400),
            (Stage::Execution, ServiceError::execution("boom"), 500),
            (Stage::Encode, ServiceError::encode("cannot render"), 500),
        ];

        for (stage, error, status) in cases {
            assert_eq!(reject(&responder, stage, error).status_code, status);
        }
    }

    #[test]
    fn status_policy_is_overridable() {
        let responder = HttpResponder::new(ResponseConfig::default().with_status_policy(
            StatusPolicy {
                missing_credential: 403,
                extract: 422,
                ..StatusPolicy::default()
            },
        ));

        let response = reject(
            &responder,
            Stage::Auth(AuthFailure::MissingCredential),
            ServiceError::missing_credential("x-auth-token header missing"),
        );
        assert_eq!(response.status_code, 403);
        assert_eq!(
            reject(&responder, Stage::Extract, ServiceError::extract("bad")).status_code,
            422
        );
    }

    #[test]
    fn failure_body_is_sanitized_json_even_for_custom_content_type() {
        let responder =
            HttpResponder::new(ResponseConfig::default().with_content_type("text/csv"));
        let error = ServiceError::not_found("s3")
            .with_code("NoSuchKey")
            .with_cause(crate::error::BackendError::new("internal detail"));

        let response = reject(&responder, Stage::Execution, error);

        assert_eq!(response.header("Content-Type"), Some(JSON_CONTENT_TYPE));
        let body: Value = serde_json::from_str(&response.body).expect("body should be JSON");
        assert_eq!(
            body,
            json!({
                "message": "failed",
                "errors": [{
                    "message": "not found",
                    "source": "s3",
                    "kind": "not_found",
                    "code": "NoSuchKey",
                }]
            })
        );
    }
}
