use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_model_core::auth::{AccessDetails, Authenticator, Identity};
use service_model_core::error::{ServiceError, SOURCE_AUTH};
use service_model_core::result::ServiceResult;
use service_model_core::storage::{OptionBag, Storage};
use subtle::ConstantTimeEq;

/// Shared token document kept in the secrets vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedToken {
    pub token: String,
    pub subject: String,
    #[serde(default)]
    pub details: AccessDetails,
    /// Realms the token is valid for; empty means any realm.
    #[serde(default)]
    pub realms: Vec<String>,
}

impl SharedToken {
    fn matches(&self, credential: &str) -> bool {
        bool::from(self.token.as_bytes().ct_eq(credential.as_bytes()))
    }

    fn admits(&self, realm: Option<&str>) -> bool {
        match realm {
            Some(realm) if !self.realms.is_empty() => self.realms.iter().any(|item| item == realm),
            _ => true,
        }
    }
}

/// Accepts exactly the token stored under one secret id. The secret is read
/// on every verification so rotation takes effect without a redeploy.
pub struct SharedTokenAuthenticator<S> {
    secrets: S,
    secret_id: String,
}

impl<S> SharedTokenAuthenticator<S>
where
    S: Storage<Key = String, Record = SharedToken>,
{
    pub fn new(secrets: S, secret_id: impl Into<String>) -> Self {
        Self {
            secrets,
            secret_id: secret_id.into(),
        }
    }
}

#[async_trait]
impl<S> Authenticator for SharedTokenAuthenticator<S>
where
    S: Storage<Key = String, Record = SharedToken>,
{
    async fn verify(&self, credential: &str, realm: Option<&str>) -> ServiceResult<Identity> {
        let shared = self
            .secrets
            .load(&self.secret_id, &OptionBag::new())
            .await
            .map_err(|failure| {
                tracing::warn!(
                    component = "auth",
                    error_kind = failure.first().kind().label(),
                    error_source = failure.first().origin(),
                    error_code = failure.first().code(),
                    "shared token could not be loaded: {}",
                    failure.first().message()
                );
                ServiceError::verification_failed("token store unavailable")
            })?;

        if !shared.matches(credential) {
            return Err(ServiceError::verification_failed("bad tokens").into());
        }
        if !shared.admits(realm) {
            return Err(ServiceError::verification_failed(format!(
                "token is not valid for realm '{}'",
                realm.unwrap_or_default()
            ))
            .into());
        }

        Ok(Identity::new(shared.subject, shared.details))
    }

    async fn grant(
        &self,
        _details: &AccessDetails,
        _subject: &str,
        _realms: Option<&[String]>,
    ) -> ServiceResult<String> {
        Err(ServiceError::not_supported(
            "shared tokens are provisioned in the secrets vault",
            SOURCE_AUTH,
        )
        .into())
    }
}
