use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use service_model_core::error::BackendError;
use service_model_core::storage::{BlobClient, NativeParams, ObjectRequest};

use super::sdk_error;

fn canned_acl(params: &NativeParams) -> Result<Option<ObjectCannedAcl>, BackendError> {
    Ok(params
        .string("ACL")?
        .map(|acl| ObjectCannedAcl::from(acl.as_str())))
}

/// [`BlobClient`] over `aws-sdk-s3`.
#[derive(Debug, Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_s3::Client::new(config))
    }
}

#[async_trait]
impl BlobClient for S3Client {
    async fn get_object(&self, request: ObjectRequest) -> Result<Vec<u8>, BackendError> {
        let params = &request.params;
        let output = self
            .client
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(params.string("VersionId")?)
            .set_range(params.string("Range")?)
            .set_if_match(params.string("IfMatch")?)
            .send()
            .await
            .map_err(sdk_error)?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|error| BackendError::new(format!("failed to read object body: {error}")))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(&self, request: ObjectRequest) -> Result<(), BackendError> {
        let params = &request.params;
        let acl = canned_acl(params)?;

        self.client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body.clone().unwrap_or_default()))
            .set_acl(acl)
            .set_content_type(params.string("ContentType")?)
            .set_cache_control(params.string("CacheControl")?)
            .send()
            .await
            .map(|_| ())
            .map_err(sdk_error)
    }

    async fn delete_object(&self, request: ObjectRequest) -> Result<(), BackendError> {
        self.client
            .delete_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.params.string("VersionId")?)
            .send()
            .await
            .map(|_| ())
            .map_err(sdk_error)
    }
}
