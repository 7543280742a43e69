use std::sync::Arc;

use async_trait::async_trait;

use super::adapter::{adapter_fault, RawDataAdapter};
use super::options::{map_options, FieldMap, NativeParams, OptionBag};
use super::{natural_key_failure, Storage, BACKEND_SECRETS_MANAGER};
use crate::error::{BackendError, ServiceError, StorageFault};
use crate::result::{Failure, ServiceResult};

const LOAD_FIELDS: FieldMap = &[("versionId", "VersionId"), ("versionStage", "VersionStage")];

pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

#[derive(Debug, Clone, PartialEq)]
pub struct SecretRequest {
    pub secret_id: String,
    pub params: NativeParams,
}

/// Secret value as stored by the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    Text(String),
    Binary(Vec<u8>),
}

#[async_trait]
pub trait SecretClient: Send + Sync {
    async fn get_secret_value(&self, request: SecretRequest) -> Result<SecretPayload, BackendError>;
}

/// Read-only [`Storage`] over a secrets vault.
pub struct SecretStorage<C, A> {
    client: Arc<C>,
    adapter: A,
}

impl<C, A> SecretStorage<C, A> {
    pub fn new(client: Arc<C>, adapter: A) -> Self {
        Self { client, adapter }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

fn backend_failure(error: BackendError) -> Failure {
    if error.has_code(RESOURCE_NOT_FOUND) {
        return ServiceError::not_found(BACKEND_SECRETS_MANAGER)
            .with_code(RESOURCE_NOT_FOUND)
            .with_cause(error)
            .into();
    }

    let message = error.code.clone().unwrap_or_else(|| error.message.clone());
    let mut result =
        ServiceError::storage(StorageFault::BackendFault, message, BACKEND_SECRETS_MANAGER);
    if let Some(code) = &error.code {
        result = result.with_code(code.clone());
    }
    result.with_cause(error).into()
}

fn payload_text(payload: SecretPayload) -> ServiceResult<String> {
    match payload {
        SecretPayload::Text(text) => Ok(text),
        SecretPayload::Binary(bytes) => String::from_utf8(bytes).map_err(|error| {
            ServiceError::storage(
                StorageFault::DeserializeFault,
                "binary secret is not valid UTF-8",
                BACKEND_SECRETS_MANAGER,
            )
            .with_cause(error)
            .into()
        }),
    }
}

#[async_trait]
impl<C, A> Storage for SecretStorage<C, A>
where
    C: SecretClient + 'static,
    A: RawDataAdapter + 'static,
{
    type Key = String;
    type Record = A::Data;

    async fn new_key(&self, _options: &OptionBag) -> ServiceResult<String> {
        natural_key_failure(BACKEND_SECRETS_MANAGER)
    }

    async fn load(&self, secret_id: &String, options: &OptionBag) -> ServiceResult<A::Data> {
        let params = map_options(BACKEND_SECRETS_MANAGER, LOAD_FIELDS, options)?;
        let request = SecretRequest {
            secret_id: secret_id.clone(),
            params,
        };

        tracing::debug!(
            backend = BACKEND_SECRETS_MANAGER,
            secret_id = %secret_id,
            "get secret value"
        );
        let payload = self
            .client
            .get_secret_value(request)
            .await
            .map_err(backend_failure)?;
        let text = payload_text(payload)?;

        self.adapter.deserialize(text.as_bytes()).map_err(|cause| {
            adapter_fault(
                StorageFault::DeserializeFault,
                "secret could not be deserialized",
                BACKEND_SECRETS_MANAGER,
                cause,
            )
            .into()
        })
    }

    async fn save(&self, _record: A::Data, _options: &OptionBag) -> ServiceResult<A::Data> {
        Err(ServiceError::not_supported("save is not supported", BACKEND_SECRETS_MANAGER).into())
    }

    async fn erase(&self, _secret_id: &String, _options: &OptionBag) -> ServiceResult<bool> {
        Err(ServiceError::not_supported("erase is not supported", BACKEND_SECRETS_MANAGER).into())
    }
}
