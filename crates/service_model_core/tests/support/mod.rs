#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use service_model_core::auth::{AccessDetails, AccessRequirement, Authenticator, Identity};
use service_model_core::error::ServiceError;
use service_model_core::executable::Executable;
use service_model_core::pipeline::Pipeline;
use service_model_core::response::{HttpResponder, HttpResponse, ResponseConfig};
use service_model_core::result::ServiceResult;

pub const AUTH_HEADER: &str = "x-auth-token";

/// Transport input shaped like a proxied HTTP request.
#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ProxyRequest {
    pub fn with_token(token: &str, body: &str) -> Self {
        Self {
            headers: BTreeMap::from([(AUTH_HEADER.to_string(), token.to_string())]),
            body: Some(body.to_string()),
        }
    }

    pub fn anonymous(body: &str) -> Self {
        Self {
            headers: BTreeMap::new(),
            body: Some(body.to_string()),
        }
    }
}

pub fn header_token(request: &ProxyRequest) -> ServiceResult<String> {
    request
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(AUTH_HEADER))
        .map(|(_, value)| value.clone())
        .ok_or_else(|| ServiceError::missing_credential(format!("{AUTH_HEADER} header missing")).into())
}

pub fn body_text(request: &ProxyRequest, _identity: &Identity) -> ServiceResult<String> {
    request
        .body
        .clone()
        .ok_or_else(|| ServiceError::extract("request body is required").into())
}

/// Accepts tokens it granted itself, plus a fixed `right` token.
#[derive(Default)]
pub struct TokenTable {
    issued: Mutex<BTreeMap<String, Identity>>,
    verify_calls: AtomicUsize,
}

impl TokenTable {
    pub fn with_right_token(details: AccessDetails) -> Self {
        let table = Self::default();
        table
            .issued
            .lock()
            .expect("poisoned mutex")
            .insert("right".to_string(), Identity::new("testUser", details));
        table
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for TokenTable {
    async fn verify(&self, credential: &str, _realm: Option<&str>) -> ServiceResult<Identity> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.issued
            .lock()
            .expect("poisoned mutex")
            .get(credential)
            .cloned()
            .ok_or_else(|| ServiceError::verification_failed("bad tokens").into())
    }

    async fn grant(
        &self,
        details: &AccessDetails,
        subject: &str,
        _realms: Option<&[String]>,
    ) -> ServiceResult<String> {
        let mut issued = self.issued.lock().expect("poisoned mutex");
        let token = format!("token-{}", issued.len());
        issued.insert(token.clone(), Identity::new(subject, details.clone()));
        Ok(token)
    }
}

/// Reverses its input string.
#[derive(Default)]
pub struct Reverser {
    pub access: Option<AccessRequirement>,
    calls: AtomicUsize,
}

impl Reverser {
    pub fn requiring(access_object: &str, operation: &str) -> Self {
        Self {
            access: Some(AccessRequirement::new(access_object, operation)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executable for Reverser {
    type Input = String;
    type Output = String;

    async fn execute(&self, input: String) -> ServiceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(input.chars().rev().collect())
    }

    fn access(&self) -> Option<&AccessRequirement> {
        self.access.as_ref()
    }
}

pub fn reader_details() -> AccessDetails {
    AccessDetails::from([("test".to_string(), vec!["read".to_string()])])
}

pub fn reverse_pipeline(
    authenticator: Arc<TokenTable>,
    executable: Arc<Reverser>,
    config: ResponseConfig,
) -> Pipeline<ProxyRequest, Reverser, HttpResponse> {
    Pipeline::new(
        authenticator,
        executable,
        header_token,
        body_text,
        HttpResponder::new(config),
    )
}
