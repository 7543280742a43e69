//! API Gateway proxy transport for a [`Pipeline`].
//!
//! The event shape, the credential header and the panic boundary live here;
//! everything between credential lookup and response encoding is the
//! pipeline's business.

use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;

use base64::Engine;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_model_core::auth::Identity;
use service_model_core::error::ServiceError;
use service_model_core::executable::Executable;
use service_model_core::pipeline::{
    CredentialSource, InputExtractor, Pipeline, Stage, StageFailure,
};
use service_model_core::response::HttpResponse;
use service_model_core::result::ServiceResult;

pub const DEFAULT_AUTH_HEADER: &str = "x-auth-token";

/// Subset of the API Gateway REST proxy event the handlers read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayProxyEvent {
    pub resource: Option<String>,
    pub path: Option<String>,
    pub http_method: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub path_parameters: Option<BTreeMap<String, String>>,
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    pub request_context: Option<Value>,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

impl ApiGatewayProxyEvent {
    /// Header lookup ignoring ASCII case, as API Gateway forwards client
    /// spelling untouched.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.as_ref()?.get(name).map(String::as_str)
    }

    /// Request body with base64 transfer encoding undone.
    pub fn decoded_body(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        if self.is_base64_encoded {
            return base64::engine::general_purpose::STANDARD
                .decode(body)
                .map(Some);
        }
        Ok(Some(body.clone().into_bytes()))
    }
}

/// Pipeline input: the proxy event plus the invocation id from the runtime
/// context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyInput {
    pub event: ApiGatewayProxyEvent,
    pub request_id: String,
}

impl ProxyInput {
    pub fn new(event: ApiGatewayProxyEvent, request_id: impl Into<String>) -> Self {
        Self {
            event,
            request_id: request_id.into(),
        }
    }
}

/// Reads the bearer credential from a named request header.
#[derive(Debug, Clone)]
pub struct HeaderCredentials {
    header: String,
}

impl HeaderCredentials {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }
}

impl Default for HeaderCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_HEADER)
    }
}

impl CredentialSource<ProxyInput> for HeaderCredentials {
    fn credential(&self, input: &ProxyInput) -> ServiceResult<String> {
        match input.event.header(&self.header) {
            Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
            _ => Err(
                ServiceError::missing_credential(format!("{} header missing", self.header)).into(),
            ),
        }
    }
}

/// Extracts one path parameter as the executable input.
#[derive(Debug, Clone)]
pub struct PathParameter {
    name: String,
}

impl PathParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl InputExtractor<ProxyInput, String> for PathParameter {
    fn extract(&self, input: &ProxyInput, _identity: &Identity) -> ServiceResult<String> {
        input
            .event
            .path_parameter(&self.name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::extract(format!("path parameter '{}' is required", self.name)).into()
            })
    }
}

/// Decodes the request body as JSON into `T`.
pub struct JsonBody<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Default for JsonBody<T> {
    fn default() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> InputExtractor<ProxyInput, T> for JsonBody<T>
where
    T: DeserializeOwned,
{
    fn extract(&self, input: &ProxyInput, _identity: &Identity) -> ServiceResult<T> {
        let raw = input
            .event
            .decoded_body()
            .map_err(|error| {
                ServiceError::extract("request body is not valid base64").with_cause(error)
            })?
            .ok_or_else(|| ServiceError::extract("request body is required"))?;

        serde_json::from_slice(&raw).map_err(|error| {
            ServiceError::extract(format!("malformed JSON body: {error}"))
                .with_cause(error)
                .into()
        })
    }
}

/// Runs one proxy invocation through `pipeline`. A panic inside any stage is
/// answered as an execution failure instead of tearing down the runtime.
pub async fn handle_proxy_event<X>(
    pipeline: &Pipeline<ProxyInput, X, HttpResponse>,
    input: ProxyInput,
) -> HttpResponse
where
    X: Executable + 'static,
{
    let request_id = input.request_id.clone();
    match AssertUnwindSafe(pipeline.handle(input)).catch_unwind().await {
        Ok(response) => {
            tracing::info!(
                component = "proxy",
                request_id = %request_id,
                status_code = response.status_code,
                "request handled"
            );
            response
        }
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            tracing::error!(
                component = "proxy",
                request_id = %request_id,
                panic = %detail,
                "executable panicked"
            );
            let failure = StageFailure::new(
                Stage::Execution,
                Stage::Execution.failure_message(),
                ServiceError::execution(format!("unexpected panic: {detail}")).into(),
            );
            pipeline.reject(&failure)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use service_model_core::auth::AccessDetails;

    use super::*;

    fn event(value: Value) -> ApiGatewayProxyEvent {
        serde_json::from_value(value).expect("event should deserialize")
    }

    fn identity() -> Identity {
        Identity::new("testUser", AccessDetails::new())
    }

    #[test]
    fn deserializes_api_gateway_shape() {
        let parsed = event(json!({
            "resource": "/records/{id}",
            "path": "/records/42",
            "httpMethod": "GET",
            "headers": {"X-Auth-Token": "right"},
            "pathParameters": {"id": "42"},
            "queryStringParameters": null,
            "requestContext": {"stage": "prod"},
            "body": null,
            "isBase64Encoded": false
        }));

        assert_eq!(parsed.http_method.as_deref(), Some("GET"));
        assert_eq!(parsed.path_parameter("id"), Some("42"));
        assert_eq!(parsed.header("x-auth-token"), Some("right"));
        assert_eq!(parsed.query_string_parameters, None);
    }

    #[test]
    fn header_credentials_are_case_insensitive() {
        let input = ProxyInput::new(event(json!({"headers": {"X-AUTH-TOKEN": "right"}})), "req-1");

        let token = HeaderCredentials::default()
            .credential(&input)
            .expect("token should be found");

        assert_eq!(token, "right");
    }

    #[test]
    fn absent_or_blank_header_is_missing_credential() {
        let credentials = HeaderCredentials::new("authorization");

        for value in [json!({}), json!({"headers": {"authorization": " "}})] {
            let failure = credentials
                .credential(&ProxyInput::new(event(value), "req-1"))
                .expect_err("no usable credential");
            assert_eq!(failure.first().message(), "authorization header missing");
            assert!(failure.first().kind().is_auth());
        }
    }

    #[test]
    fn path_parameter_extraction() {
        let extractor = PathParameter::new("id");
        let present = ProxyInput::new(event(json!({"pathParameters": {"id": "42"}})), "req-1");
        let absent = ProxyInput::new(event(json!({})), "req-2");

        assert_eq!(extractor.extract(&present, &identity()).expect("id"), "42");
        let failure = extractor
            .extract(&absent, &identity())
            .expect_err("id is required");
        assert_eq!(failure.first().message(), "path parameter 'id' is required");
        assert_eq!(failure.first().origin(), "extract");
    }

    #[test]
    fn json_body_decodes_plain_and_base64_bodies() {
        let extractor = JsonBody::<Value>::default();
        let plain = ProxyInput::new(event(json!({"body": "{\"name\":\"client\"}"})), "req-1");
        let encoded = ProxyInput::new(
            event(json!({"body": "eyJuYW1lIjoiY2xpZW50In0=", "isBase64Encoded": true})),
            "req-2",
        );

        assert_eq!(
            extractor.extract(&plain, &identity()).expect("plain body"),
            json!({"name": "client"})
        );
        assert_eq!(
            extractor.extract(&encoded, &identity()).expect("encoded body"),
            json!({"name": "client"})
        );
    }

    #[test]
    fn json_body_reports_malformed_input() {
        let extractor = JsonBody::<Value>::default();
        let input = ProxyInput::new(event(json!({"body": "{not json"})), "req-1");

        let failure = extractor
            .extract(&input, &identity())
            .expect_err("malformed body");

        assert!(failure.first().message().starts_with("malformed JSON body"));
    }
}
