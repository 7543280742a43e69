use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::adapter::{adapter_fault, RawDataAdapter};
use super::options::{map_options, FieldMap, NativeParams, OptionBag};
use super::{natural_key_failure, Storage, BACKEND_S3};
use crate::error::{BackendError, ServiceError, StorageFault};
use crate::result::{Failure, ServiceResult};

const LOAD_FIELDS: FieldMap = &[
    ("versionId", "VersionId"),
    ("range", "Range"),
    ("ifMatch", "IfMatch"),
];

const SAVE_FIELDS: FieldMap = &[
    ("key", "Key"),
    ("acl", "ACL"),
    ("contentType", "ContentType"),
    ("cacheControl", "CacheControl"),
];

const ERASE_FIELDS: FieldMap = &[("versionId", "VersionId")];

pub const NO_SUCH_KEY: &str = "NoSuchKey";
pub const DEFAULT_ACL: &str = "private";

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Option<Vec<u8>>,
    pub params: NativeParams,
}

#[async_trait]
pub trait BlobClient: Send + Sync {
    async fn get_object(&self, request: ObjectRequest) -> Result<Vec<u8>, BackendError>;

    async fn put_object(&self, request: ObjectRequest) -> Result<(), BackendError>;

    async fn delete_object(&self, request: ObjectRequest) -> Result<(), BackendError>;
}

/// [`Storage`] over one bucket. Objects are keyed by their path and decoded
/// with a [`RawDataAdapter`].
pub struct BlobStorage<C, A> {
    client: Arc<C>,
    bucket: String,
    adapter: A,
}

impl<C, A> BlobStorage<C, A> {
    pub fn new(client: Arc<C>, bucket: impl Into<String>, adapter: A) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            adapter,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn request(&self, key: String, body: Option<Vec<u8>>, params: NativeParams) -> ObjectRequest {
        ObjectRequest {
            bucket: self.bucket.clone(),
            key,
            body,
            params,
        }
    }
}

fn backend_failure(error: BackendError) -> Failure {
    if error.has_code(NO_SUCH_KEY) {
        return ServiceError::not_found(BACKEND_S3)
            .with_code(NO_SUCH_KEY)
            .with_cause(error)
            .into();
    }
    ServiceError::backend(BACKEND_S3, &error).into()
}

fn object_key(params: &mut NativeParams) -> ServiceResult<String> {
    match params.remove("Key") {
        Some(Value::String(key)) if !key.is_empty() => Ok(key),
        Some(_) => Err(
            ServiceError::not_supported("key option must be a non-empty string", BACKEND_S3).into(),
        ),
        None => Err(ServiceError::not_supported("key option is required", BACKEND_S3).into()),
    }
}

#[async_trait]
impl<C, A> Storage for BlobStorage<C, A>
where
    C: BlobClient + 'static,
    A: RawDataAdapter + 'static,
{
    type Key = String;
    type Record = A::Data;

    async fn new_key(&self, _options: &OptionBag) -> ServiceResult<String> {
        natural_key_failure(BACKEND_S3)
    }

    async fn load(&self, key: &String, options: &OptionBag) -> ServiceResult<A::Data> {
        let params = map_options(BACKEND_S3, LOAD_FIELDS, options)?;
        let request = self.request(key.clone(), None, params);

        tracing::debug!(backend = BACKEND_S3, bucket = %self.bucket, key = %key, "get object");
        let body = self.client.get_object(request).await.map_err(backend_failure)?;

        self.adapter.deserialize(&body).map_err(|cause| {
            adapter_fault(
                StorageFault::DeserializeFault,
                "object body could not be deserialized",
                BACKEND_S3,
                cause,
            )
            .into()
        })
    }

    async fn save(&self, record: A::Data, options: &OptionBag) -> ServiceResult<A::Data> {
        let mut params = map_options(BACKEND_S3, SAVE_FIELDS, options)?;
        let key = object_key(&mut params)?;
        if !params.contains("ACL") {
            params.insert("ACL", Value::from(DEFAULT_ACL));
        }
        let body = self.adapter.serialize(&record).map_err(|cause| {
            adapter_fault(
                StorageFault::SerializeFault,
                "object body could not be serialized",
                BACKEND_S3,
                cause,
            )
        })?;

        tracing::debug!(backend = BACKEND_S3, bucket = %self.bucket, key = %key, "put object");
        self.client
            .put_object(self.request(key, Some(body), params))
            .await
            .map_err(backend_failure)?;
        Ok(record)
    }

    async fn erase(&self, key: &String, options: &OptionBag) -> ServiceResult<bool> {
        let params = map_options(BACKEND_S3, ERASE_FIELDS, options)?;

        tracing::debug!(backend = BACKEND_S3, bucket = %self.bucket, key = %key, "delete object");
        self.client
            .delete_object(self.request(key.clone(), None, params))
            .await
            .map_err(backend_failure)?;
        Ok(true)
    }
}
