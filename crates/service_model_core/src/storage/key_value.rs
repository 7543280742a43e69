use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::adapter::{adapter_fault, Document, ModelAdapter, SimpleModelAdapter};
use super::options::{map_options, FieldMap, NativeParams, OptionBag};
use super::{natural_key_failure, Model, Storage, BACKEND_DYNAMODB};
use crate::error::{BackendError, ServiceError, StorageFault};
use crate::result::{Failure, ServiceResult};

const LOAD_FIELDS: FieldMap = &[
    ("consistentRead", "ConsistentRead"),
    ("projectionExpression", "ProjectionExpression"),
    ("expressionAttributeNames", "ExpressionAttributeNames"),
    ("returnConsumedCapacity", "ReturnConsumedCapacity"),
];

const SAVE_FIELDS: FieldMap = &[
    ("conditionExpression", "ConditionExpression"),
    ("expressionAttributeNames", "ExpressionAttributeNames"),
    ("expressionAttributeValues", "ExpressionAttributeValues"),
    ("returnValues", "ReturnValues"),
    ("returnConsumedCapacity", "ReturnConsumedCapacity"),
    ("returnItemCollectionMetrics", "ReturnItemCollectionMetrics"),
    ("updateExpression", "UpdateExpression"),
];

const ERASE_FIELDS: FieldMap = &[
    ("conditionExpression", "ConditionExpression"),
    ("expressionAttributeNames", "ExpressionAttributeNames"),
    ("expressionAttributeValues", "ExpressionAttributeValues"),
    ("returnValues", "ReturnValues"),
    ("returnConsumedCapacity", "ReturnConsumedCapacity"),
    ("returnItemCollectionMetrics", "ReturnItemCollectionMetrics"),
];

pub const UPDATE_EXPRESSION: &str = "UpdateExpression";
pub const RETURN_VALUES: &str = "ReturnValues";

/// One request against a key-value table. `key` is set for get, update and
/// delete; `item` for put.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRequest {
    pub table_name: String,
    pub key: Option<Document>,
    pub item: Option<Document>,
    pub params: NativeParams,
}

/// Minimal surface of a key-value backend. Every call returns the attributes
/// the backend chose to send back, if any.
#[async_trait]
pub trait KeyValueClient: Send + Sync {
    async fn get_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError>;

    async fn put_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError>;

    async fn update_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError>;

    async fn delete_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError>;
}

/// [`Storage`] over one key-value table, holding [`Model`] records.
pub struct KeyValueStorage<C, K, P> {
    client: Arc<C>,
    table: String,
    adapter: Arc<dyn ModelAdapter<K, P>>,
}

impl<C, K, P> KeyValueStorage<C, K, P>
where
    K: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(client: Arc<C>, table: impl Into<String>) -> Self {
        Self::with_adapter(client, table, Arc::new(SimpleModelAdapter))
    }
}

impl<C, K, P> KeyValueStorage<C, K, P> {
    pub fn with_adapter(
        client: Arc<C>,
        table: impl Into<String>,
        adapter: Arc<dyn ModelAdapter<K, P>>,
    ) -> Self {
        Self {
            client,
            table: table.into(),
            adapter,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn key_document(&self, key: &K) -> ServiceResult<Document> {
        self.adapter.key_document(key).map_err(|cause| {
            adapter_fault(
                StorageFault::SerializeFault,
                "key to item convert error",
                BACKEND_DYNAMODB,
                cause,
            )
            .into()
        })
    }

    fn model_from_item(&self, item: Document) -> ServiceResult<Model<K, P>> {
        self.adapter.from_item(item).map_err(|cause| {
            adapter_fault(
                StorageFault::DeserializeFault,
                "item to model convert error",
                BACKEND_DYNAMODB,
                cause,
            )
            .into()
        })
    }

    fn request(
        &self,
        key: Option<Document>,
        item: Option<Document>,
        params: NativeParams,
    ) -> ItemRequest {
        ItemRequest {
            table_name: self.table.clone(),
            key,
            item,
            params,
        }
    }
}

fn backend_failure(error: BackendError) -> Failure {
    ServiceError::backend(BACKEND_DYNAMODB, &error).into()
}

/// How the attributes echoed by an update relate to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnedImage {
    /// The whole item after the update.
    Full,
    /// Only the attributes the update wrote.
    Updated,
    Omitted,
}

impl ReturnedImage {
    fn of(params: &NativeParams) -> Self {
        match params.get(RETURN_VALUES).and_then(Value::as_str) {
            Some("ALL_NEW") => ReturnedImage::Full,
            Some("UPDATED_NEW") => ReturnedImage::Updated,
            _ => ReturnedImage::Omitted,
        }
    }
}

/// A null or blank `UpdateExpression` is dropped so the save falls back to a put.
fn take_update_expression(params: &mut NativeParams) -> bool {
    let blank = match params.get(UPDATE_EXPRESSION) {
        None => return false,
        Some(Value::Null) => true,
        Some(Value::String(expression)) => expression.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        params.remove(UPDATE_EXPRESSION);
    }
    !blank
}

#[async_trait]
impl<C, K, P> Storage for KeyValueStorage<C, K, P>
where
    C: KeyValueClient + 'static,
    K: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    type Key = K;
    type Record = Model<K, P>;

    async fn new_key(&self, _options: &OptionBag) -> ServiceResult<K> {
        natural_key_failure(BACKEND_DYNAMODB)
    }

    async fn load(&self, key: &K, options: &OptionBag) -> ServiceResult<Model<K, P>> {
        let params = map_options(BACKEND_DYNAMODB, LOAD_FIELDS, options)?;
        let request = self.request(Some(self.key_document(key)?), None, params);

        tracing::debug!(backend = BACKEND_DYNAMODB, table = %self.table, "get item");
        let item = self.client.get_item(request).await.map_err(backend_failure)?;

        match item {
            Some(item) if !item.is_empty() => self.model_from_item(item),
            _ => Err(ServiceError::not_found(BACKEND_DYNAMODB).into()),
        }
    }

    async fn save(&self, record: Model<K, P>, options: &OptionBag) -> ServiceResult<Model<K, P>> {
        let mut params = map_options(BACKEND_DYNAMODB, SAVE_FIELDS, options)?;
        let item = self.adapter.to_item(&record).map_err(|cause| {
            adapter_fault(
                StorageFault::SerializeFault,
                "model to item convert error",
                BACKEND_DYNAMODB,
                cause,
            )
        })?;

        if !take_update_expression(&mut params) {
            let request = self.request(None, Some(item), params);
            tracing::debug!(backend = BACKEND_DYNAMODB, table = %self.table, "put item");
            self.client.put_item(request).await.map_err(backend_failure)?;
            return Ok(record);
        }

        let image = ReturnedImage::of(&params);
        let key = self.key_document(&record.key)?;
        let request = self.request(Some(key.clone()), None, params);
        tracing::debug!(backend = BACKEND_DYNAMODB, table = %self.table, "update item");
        let returned = self.client.update_item(request).await.map_err(backend_failure)?;

        match (image, returned) {
            (ReturnedImage::Full, Some(attributes)) if !attributes.is_empty() => {
                let mut snapshot = key;
                snapshot.extend(attributes);
                self.model_from_item(snapshot)
            }
            (ReturnedImage::Updated, Some(attributes)) if !attributes.is_empty() => {
                let mut snapshot = item;
                snapshot.extend(attributes);
                self.model_from_item(snapshot)
            }
            _ => Ok(record),
        }
    }

    async fn erase(&self, key: &K, options: &OptionBag) -> ServiceResult<bool> {
        let params = map_options(BACKEND_DYNAMODB, ERASE_FIELDS, options)?;
        let request = self.request(Some(self.key_document(key)?), None, params);

        tracing::debug!(backend = BACKEND_DYNAMODB, table = %self.table, "delete item");
        self.client.delete_item(request).await.map_err(backend_failure)?;
        Ok(true)
    }
}
