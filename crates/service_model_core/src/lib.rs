//! Request pipeline and storage contracts for serverless service handlers.
//!
//! This crate owns the result algebra, the error taxonomy, the staged
//! authenticate → extract → execute → encode pipeline, the response mapper and
//! the storage operators written against backend client traits. It
//! intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod auth;
pub mod error;
pub mod executable;
pub mod pipeline;
pub mod response;
pub mod result;
pub mod storage;

pub use auth::{AccessDetails, AccessRequirement, Authenticator, Identity};
pub use error::{AuthFailure, BackendError, ErrorKind, ServiceError, StorageFault};
pub use executable::Executable;
pub use pipeline::{Pipeline, PipelineConfig, Stage, StageFailure};
pub use response::{HttpResponder, HttpResponse, ResponseConfig, ResponseEncoder, StatusPolicy};
pub use result::{Failure, ServiceResult};
