//! Uniform CRUD contract over the key-value, blob and secret backends.
//!
//! Each operator implements [`Storage`] on top of a small backend client
//! trait, so the translation rules (not-found normalization, option mapping,
//! natural keys) live here while the network clients live with the runtime
//! integration.

pub mod adapter;
pub mod blob;
pub mod key_value;
pub mod options;
pub mod secret;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::result::ServiceResult;

pub use adapter::{Document, JsonDataAdapter, ModelAdapter, RawDataAdapter, SimpleModelAdapter};
pub use blob::{BlobClient, BlobStorage, ObjectRequest};
pub use key_value::{ItemRequest, KeyValueClient, KeyValueStorage};
pub use options::{NativeParams, OptionBag};
pub use secret::{SecretClient, SecretPayload, SecretRequest, SecretStorage};

pub const BACKEND_DYNAMODB: &str = "dynamodb";
pub const BACKEND_S3: &str = "s3";
pub const BACKEND_SECRETS_MANAGER: &str = "secrets manager";

pub const USE_NATURAL_KEY: &str = "use natural key";

/// Key plus the remaining state of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model<K, P> {
    pub key: K,
    pub properties: P,
}

impl<K, P> Model<K, P> {
    pub fn new(key: K, properties: P) -> Self {
        Self { key, properties }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    type Key: Send + Sync;
    type Record: Send + Sync;

    /// Storage-generated keys are not offered; callers supply natural keys.
    async fn new_key(&self, options: &OptionBag) -> ServiceResult<Self::Key>;

    async fn load(&self, key: &Self::Key, options: &OptionBag) -> ServiceResult<Self::Record>;

    async fn save(&self, record: Self::Record, options: &OptionBag)
        -> ServiceResult<Self::Record>;

    async fn erase(&self, key: &Self::Key, options: &OptionBag) -> ServiceResult<bool>;
}

pub(crate) fn natural_key_failure<T>(backend: &str) -> ServiceResult<T> {
    Err(ServiceError::not_supported(USE_NATURAL_KEY, backend).into())
}
