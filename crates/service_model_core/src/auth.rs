use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::ServiceResult;

pub const ANY_OPERATION: &str = "*";

/// Access object name → operations the holder may perform on it.
pub type AccessDetails = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    #[serde(default)]
    pub details: AccessDetails,
}

impl Identity {
    pub fn new(subject: impl Into<String>, details: AccessDetails) -> Self {
        Self {
            subject: subject.into(),
            details,
        }
    }

    pub fn can(&self, access_object: &str, operation: &str) -> bool {
        self.details
            .get(access_object)
            .map(|operations| {
                operations
                    .iter()
                    .any(|allowed| allowed == ANY_OPERATION || allowed == operation)
            })
            .unwrap_or(false)
    }

    pub fn satisfies(&self, requirement: &AccessRequirement) -> bool {
        self.can(&requirement.access_object, &requirement.operation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    pub access_object: String,
    pub operation: String,
}

impl AccessRequirement {
    pub fn new(access_object: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            access_object: access_object.into(),
            operation: operation.into(),
        }
    }
}

/// Verifies bearer credentials and issues them.
///
/// The pipeline only calls `verify`; `grant` is for callers that mint
/// credentials (sign-in flows, tests).
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, credential: &str, realm: Option<&str>) -> ServiceResult<Identity>;

    async fn grant(
        &self,
        details: &AccessDetails,
        subject: &str,
        realms: Option<&[String]>,
    ) -> ServiceResult<String>;
}
