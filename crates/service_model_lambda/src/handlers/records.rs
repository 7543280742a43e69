use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_model_core::auth::{AccessRequirement, Authenticator};
use service_model_core::executable::Executable;
use service_model_core::pipeline::{Pipeline, PipelineConfig};
use service_model_core::response::{HttpResponder, HttpResponse, ResponseConfig};
use service_model_core::result::ServiceResult;
use service_model_core::storage::{Document, Model, OptionBag, Storage};

use super::proxy::{HeaderCredentials, PathParameter, ProxyInput};

pub const RECORDS_ACCESS_OBJECT: &str = "records";
pub const READ_OPERATION: &str = "read";
pub const ID_PARAMETER: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: String,
}

pub type Record = Model<RecordKey, Document>;

/// Loads one record by id and answers with its attributes.
pub struct RecordLookup<S> {
    records: S,
    access: AccessRequirement,
}

impl<S> RecordLookup<S>
where
    S: Storage<Key = RecordKey, Record = Record>,
{
    pub fn new(records: S) -> Self {
        Self {
            records,
            access: AccessRequirement::new(RECORDS_ACCESS_OBJECT, READ_OPERATION),
        }
    }
}

#[async_trait]
impl<S> Executable for RecordLookup<S>
where
    S: Storage<Key = RecordKey, Record = Record>,
{
    type Input = String;
    type Output = Document;

    async fn execute(&self, id: String) -> ServiceResult<Document> {
        let record = self
            .records
            .load(&RecordKey { id }, &OptionBag::new())
            .await?;
        Ok(record.properties)
    }

    fn access(&self) -> Option<&AccessRequirement> {
        Some(&self.access)
    }
}

/// Wires a lookup executable into a proxy pipeline keyed by `{id}`.
pub fn record_pipeline<S>(
    authenticator: Arc<dyn Authenticator>,
    lookup: Arc<RecordLookup<S>>,
    auth_header: &str,
    realm: Option<String>,
    responses: ResponseConfig,
) -> Pipeline<ProxyInput, RecordLookup<S>, HttpResponse>
where
    S: Storage<Key = RecordKey, Record = Record> + 'static,
{
    Pipeline::new(
        authenticator,
        lookup,
        HeaderCredentials::new(auth_header),
        PathParameter::new(ID_PARAMETER),
        HttpResponder::new(responses),
    )
    .with_config(PipelineConfig { realm })
}
