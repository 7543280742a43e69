use async_trait::async_trait;
use service_model_core::error::BackendError;
use service_model_core::storage::{SecretClient, SecretPayload, SecretRequest};

use super::sdk_error;

/// [`SecretClient`] over `aws-sdk-secretsmanager`.
#[derive(Debug, Clone)]
pub struct SecretsManagerClient {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerClient {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_secretsmanager::Client::new(config))
    }
}

#[async_trait]
impl SecretClient for SecretsManagerClient {
    async fn get_secret_value(&self, request: SecretRequest) -> Result<SecretPayload, BackendError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&request.secret_id)
            .set_version_id(request.params.string("VersionId")?)
            .set_version_stage(request.params.string("VersionStage")?)
            .send()
            .await
            .map_err(sdk_error)?;

        if let Some(text) = output.secret_string() {
            return Ok(SecretPayload::Text(text.to_string()));
        }
        if let Some(binary) = output.secret_binary() {
            return Ok(SecretPayload::Binary(binary.clone().into_inner()));
        }
        Err(BackendError::new(format!(
            "secret {} has neither a string nor a binary value",
            request.secret_id
        )))
    }
}
