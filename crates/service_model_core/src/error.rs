use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Underlying fault attached to a [`ServiceError`]. Never serialized.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

pub const SOURCE_AUTH: &str = "auth";
pub const SOURCE_EXTRACT: &str = "extract";
pub const SOURCE_EXECUTION: &str = "execution";
pub const SOURCE_ENCODE: &str = "encode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailure {
    /// The bearer credential is structurally absent from the request.
    MissingCredential,
    /// The credential was rejected or the identity lacks the privilege.
    VerificationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFault {
    NotFound,
    NotSupported,
    BackendFault,
    SerializeFault,
    DeserializeFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth(AuthFailure),
    Extract,
    Execution,
    Encode,
    Storage(StorageFault),
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Auth(AuthFailure::MissingCredential) => "missing_credential",
            ErrorKind::Auth(AuthFailure::VerificationFailed) => "verification_failed",
            ErrorKind::Extract => "extract",
            ErrorKind::Execution => "execution",
            ErrorKind::Encode => "encode",
            ErrorKind::Storage(StorageFault::NotFound) => "not_found",
            ErrorKind::Storage(StorageFault::NotSupported) => "not_supported",
            ErrorKind::Storage(StorageFault::BackendFault) => "backend_fault",
            ErrorKind::Storage(StorageFault::SerializeFault) => "serialize_fault",
            ErrorKind::Storage(StorageFault::DeserializeFault) => "deserialize_fault",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ErrorKind::Auth(_))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tagged error value carried by every [`crate::result::Failure`].
///
/// `origin` is the component, stage or backend that raised the error and is
/// rendered as `source` in response bodies.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{origin}: {message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    origin: String,
    code: Option<String>,
    #[source]
    cause: Option<Cause>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            origin: origin.into(),
            code: None,
            cause: None,
        }
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Auth(AuthFailure::MissingCredential),
            message,
            SOURCE_AUTH,
        )
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Auth(AuthFailure::VerificationFailed),
            message,
            SOURCE_AUTH,
        )
    }

    pub fn extract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Extract, message, SOURCE_EXTRACT)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message, SOURCE_EXECUTION)
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Encode, message, SOURCE_ENCODE)
    }

    pub fn storage(fault: StorageFault, message: impl Into<String>, backend: &str) -> Self {
        Self::new(ErrorKind::Storage(fault), message, backend)
    }

    pub fn not_found(backend: &str) -> Self {
        Self::storage(StorageFault::NotFound, "not found", backend)
    }

    pub fn not_supported(message: impl Into<String>, backend: &str) -> Self {
        Self::storage(StorageFault::NotSupported, message, backend)
    }

    /// Backend fault keeping the native message, code and the fault itself.
    pub fn backend(backend: &str, error: &BackendError) -> Self {
        let mut result = Self::storage(StorageFault::BackendFault, error.message.clone(), backend)
            .with_cause(error.clone());
        result.code = error.code.clone();
        result
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_boxed_cause(mut self, cause: Box<dyn std::error::Error + Send + Sync>) -> Self {
        self.cause = Some(Arc::from(cause));
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Serializable projection without the cause chain.
    pub fn view(&self) -> ErrorView<'_> {
        ErrorView {
            message: &self.message,
            source: &self.origin,
            kind: self.kind.label(),
            code: self.code.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorView<'a> {
    pub message: &'a str,
    pub source: &'a str,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
}

/// Fault reported by a backend client (a network SDK or a test double).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<String>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn backend_error_keeps_message_code_and_cause() {
        let native = BackendError::with_code("Throttling", "rate exceeded");
        let error = ServiceError::backend("dynamodb", &native);

        assert_eq!(error.message(), "rate exceeded");
        assert_eq!(error.origin(), "dynamodb");
        assert_eq!(error.code(), Some("Throttling"));
        assert_eq!(
            error.kind(),
            ErrorKind::Storage(StorageFault::BackendFault)
        );
        let cause = error.source().expect("cause should be exposed");
        assert_eq!(cause.to_string(), "rate exceeded");
    }

    #[test]
    fn view_omits_cause_and_absent_code() {
        let error = ServiceError::extract("login is required")
            .with_cause(BackendError::new("stack trace lives here"));

        let rendered = serde_json::to_value(error.view()).expect("view should serialize");
        assert_eq!(
            rendered,
            serde_json::json!({
                "message": "login is required",
                "source": "extract",
                "kind": "extract",
            })
        );
    }

    #[test]
    fn auth_sub_kinds_stay_distinct() {
        let missing = ServiceError::missing_credential("x-auth-token header missing");
        let denied = ServiceError::verification_failed("bad tokens");

        assert_ne!(missing.kind(), denied.kind());
        assert!(missing.kind().is_auth());
        assert!(denied.kind().is_auth());
        assert_eq!(missing.view().kind, "missing_credential");
        assert_eq!(denied.view().kind, "verification_failed");
    }
}
