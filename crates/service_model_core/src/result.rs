//! Success/failure container shared by every component.
//!
//! A success is `Ok(value)`; a failure is `Err(Failure)` holding one or more
//! [`ServiceError`]s in the order they were raised. `Result::unwrap` on a
//! failure is the only sanctioned panic and marks a caller that skipped the
//! `is_err` check.

use std::fmt;

use crate::error::ServiceError;

pub type ServiceResult<T> = Result<T, Failure>;

pub fn success<T>(value: T) -> ServiceResult<T> {
    Ok(value)
}

/// Panics when `errors` is empty.
pub fn failure<T>(errors: Vec<ServiceError>) -> ServiceResult<T> {
    Err(Failure::new(errors))
}

/// Non-empty ordered sequence of errors.
#[derive(Debug, Clone)]
pub struct Failure {
    errors: Vec<ServiceError>,
}

impl Failure {
    pub fn new(errors: Vec<ServiceError>) -> Self {
        assert!(
            !errors.is_empty(),
            "a failure must carry at least one error"
        );
        Self { errors }
    }

    pub fn errors(&self) -> &[ServiceError] {
        &self.errors
    }

    pub fn first(&self) -> &ServiceError {
        &self.errors[0]
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_errors(self) -> Vec<ServiceError> {
        self.errors
    }

    /// Re-tags every error with `origin`.
    pub fn with_source(self, origin: &str) -> Self {
        Self {
            errors: self
                .errors
                .into_iter()
                .map(|error| error.with_origin(origin))
                .collect(),
        }
    }

    pub fn merge(mut self, other: Failure) -> Self {
        self.errors.extend(other.errors);
        self
    }
}

impl From<ServiceError> for Failure {
    fn from(error: ServiceError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.first(), f)?;
        if self.errors.len() > 1 {
            write!(f, " (+{} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StorageFault};

    #[test]
    fn success_never_exposes_errors() {
        let result = success("client");
        assert!(result.is_ok());
        assert!(result.as_ref().err().is_none());
        assert_eq!(result.unwrap(), "client");
    }

    #[test]
    fn failure_keeps_errors_in_order() {
        let result: ServiceResult<()> = failure(vec![
            ServiceError::extract("first"),
            ServiceError::not_found("s3"),
        ]);

        let failure = result.expect_err("should fail");
        assert_eq!(failure.len(), 2);
        assert_eq!(failure.first().message(), "first");
        assert_eq!(
            failure.errors()[1].kind(),
            ErrorKind::Storage(StorageFault::NotFound)
        );
    }

    #[test]
    #[should_panic(expected = "at least one error")]
    fn empty_failure_is_rejected() {
        let _ = Failure::new(Vec::new());
    }

    #[test]
    #[should_panic]
    fn unwrapping_a_failure_panics() {
        let result: ServiceResult<u8> = Err(ServiceError::execution("boom").into());
        result.unwrap();
    }

    #[test]
    fn with_source_retags_every_error() {
        let failure = Failure::new(vec![
            ServiceError::execution("a"),
            ServiceError::execution("b"),
        ])
        .with_source("reverse");

        assert!(failure.errors().iter().all(|error| error.origin() == "reverse"));
    }

    #[test]
    fn merge_appends_other_errors() {
        let merged = Failure::from(ServiceError::extract("a"))
            .merge(Failure::from(ServiceError::extract("b")));

        let messages: Vec<&str> = merged.errors().iter().map(ServiceError::message).collect();
        assert_eq!(messages, vec!["a", "b"]);
        assert_eq!(merged.to_string(), "extract: a (+1 more)");
    }
}
