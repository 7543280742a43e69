//! Staged request pipeline.
//!
//! Token extraction, authentication, input extraction, execution and response
//! encoding run strictly in that order. Each stage yields a
//! [`ServiceResult`]; the first failure is tagged with its [`Stage`] and the
//! remaining stages never run. Every invocation ends in exactly one response.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::auth::{Authenticator, Identity};
use crate::error::{AuthFailure, ServiceError};
use crate::executable::Executable;
use crate::response::ResponseEncoder;
use crate::result::{Failure, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Auth(AuthFailure),
    Extract,
    Execution,
    Encode,
}

impl Stage {
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Auth(_) => "auth",
            Stage::Extract => "extract",
            Stage::Execution => "execution",
            Stage::Encode => "encode",
        }
    }

    /// Message rendered at the top of a failure body.
    pub fn failure_message(&self) -> &'static str {
        match self {
            Stage::Auth(AuthFailure::MissingCredential) => "Unauthorized",
            Stage::Auth(AuthFailure::VerificationFailed) => "Forbidden",
            Stage::Extract => "data extraction failed",
            Stage::Execution => "execution failed",
            Stage::Encode => "response encoding failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
    pub failure: Failure,
}

impl StageFailure {
    pub fn new(stage: Stage, message: impl Into<String>, failure: Failure) -> Self {
        Self {
            stage,
            message: message.into(),
            failure,
        }
    }
}

pub type StageResult<T> = Result<T, StageFailure>;

pub trait StageExt<T> {
    fn at_stage(self, stage: Stage) -> StageResult<T>;
}

impl<T> StageExt<T> for ServiceResult<T> {
    fn at_stage(self, stage: Stage) -> StageResult<T> {
        self.map_err(|failure| StageFailure::new(stage, stage.failure_message(), failure))
    }
}

/// Pulls the bearer credential out of the transport input.
pub trait CredentialSource<I>: Send + Sync {
    fn credential(&self, input: &I) -> ServiceResult<String>;
}

impl<I, F> CredentialSource<I> for F
where
    F: Fn(&I) -> ServiceResult<String> + Send + Sync,
{
    fn credential(&self, input: &I) -> ServiceResult<String> {
        self(input)
    }
}

/// Maps the transport input, plus the verified identity, to executable input.
pub trait InputExtractor<I, T>: Send + Sync {
    fn extract(&self, input: &I, identity: &Identity) -> ServiceResult<T>;
}

impl<I, T, F> InputExtractor<I, T> for F
where
    F: Fn(&I, &Identity) -> ServiceResult<T> + Send + Sync,
{
    fn extract(&self, input: &I, identity: &Identity) -> ServiceResult<T> {
        self(input, identity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Realm handed to `Authenticator::verify`.
    pub realm: Option<String>,
}

/// One pipeline bound to one authenticator and one executable. Immutable
/// after construction; share it across invocations.
pub struct Pipeline<I, X, R>
where
    X: Executable,
{
    authenticator: Arc<dyn Authenticator>,
    executable: Arc<X>,
    credentials: Arc<dyn CredentialSource<I>>,
    extractor: Arc<dyn InputExtractor<I, X::Input>>,
    encoder: Arc<dyn ResponseEncoder<X::Output, Response = R>>,
    config: PipelineConfig,
    _input: PhantomData<fn(I)>,
}

impl<I, X, R> Pipeline<I, X, R>
where
    I: Send + Sync + 'static,
    X: Executable + 'static,
    R: Send + 'static,
{
    pub fn new<C, E, N>(
        authenticator: Arc<dyn Authenticator>,
        executable: Arc<X>,
        credentials: C,
        extractor: E,
        encoder: N,
    ) -> Self
    where
        C: CredentialSource<I> + 'static,
        E: InputExtractor<I, X::Input> + 'static,
        N: ResponseEncoder<X::Output, Response = R> + 'static,
    {
        Self {
            authenticator,
            executable,
            credentials: Arc::new(credentials),
            extractor: Arc::new(extractor),
            encoder: Arc::new(encoder),
            config: PipelineConfig::default(),
            _input: PhantomData,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn handle(&self, input: I) -> R {
        match self.run(&input).await {
            Ok(response) => {
                tracing::debug!(component = "pipeline", "request completed");
                response
            }
            Err(failure) => self.reject(&failure),
        }
    }

    /// Renders a failure through the encoder. Also used by transports that
    /// catch faults outside the pipeline.
    pub fn reject(&self, failure: &StageFailure) -> R {
        let first = failure.failure.first();
        tracing::warn!(
            component = "pipeline",
            stage = failure.stage.tag(),
            error_kind = first.kind().label(),
            error_source = first.origin(),
            error_count = failure.failure.len(),
            "{}: {}",
            failure.message,
            first.message()
        );
        self.encoder.encode_failure(failure)
    }

    async fn run(&self, input: &I) -> StageResult<R> {
        let credential = self
            .credentials
            .credential(input)
            .at_stage(Stage::Auth(AuthFailure::MissingCredential))?;

        let identity = self
            .authenticate(&credential)
            .await
            .at_stage(Stage::Auth(AuthFailure::VerificationFailed))?;

        let data = self
            .extractor
            .extract(input, &identity)
            .at_stage(Stage::Extract)?;

        let output = self
            .executable
            .execute(data)
            .await
            .at_stage(Stage::Execution)?;

        self.encoder
            .encode_success(&output)
            .at_stage(Stage::Encode)
    }

    async fn authenticate(&self, credential: &str) -> ServiceResult<Identity> {
        let identity = self
            .authenticator
            .verify(credential, self.config.realm.as_deref())
            .await?;

        if let Some(requirement) = self.executable.access() {
            if !identity.satisfies(requirement) {
                return Err(ServiceError::verification_failed(format!(
                    "access denied: {} may not {} {}",
                    identity.subject, requirement.operation, requirement.access_object
                ))
                .into());
            }
        }

        Ok(identity)
    }
}
