use async_trait::async_trait;

use crate::auth::AccessRequirement;
use crate::result::ServiceResult;

/// Business computation run by the pipeline after authentication and input
/// extraction.
#[async_trait]
pub trait Executable: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    async fn execute(&self, input: Self::Input) -> ServiceResult<Self::Output>;

    /// Privilege the verified identity must hold before `execute` runs.
    fn access(&self) -> Option<&AccessRequirement> {
        None
    }
}
