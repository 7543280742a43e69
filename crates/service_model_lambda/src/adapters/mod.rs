//! SDK-backed implementations of the storage backend client traits.

pub mod dynamodb;
pub mod s3;
pub mod secrets_manager;

use std::error::Error;
use std::fmt::Debug;

// Every AWS SDK crate re-exports the same smithy error types.
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use service_model_core::error::BackendError;

/// Keeps the service error code (`NoSuchKey`, `ResourceNotFoundException`,
/// ...) and the most specific message the SDK offers.
pub(crate) fn sdk_error<E, R>(error: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&error).to_string());
    BackendError {
        code: error.code().map(str::to_string),
        message,
    }
}
