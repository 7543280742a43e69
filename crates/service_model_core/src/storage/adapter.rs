use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Model;
use crate::error::{ServiceError, StorageFault};

/// Flat attribute document exchanged with the key-value backend.
pub type Document = Map<String, Value>;

pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// Converts a record to and from the raw bytes stored by a blob or secret
/// backend.
pub trait RawDataAdapter: Send + Sync {
    type Data: Send + Sync;

    fn serialize(&self, data: &Self::Data) -> Result<Vec<u8>, AdapterError>;

    fn deserialize(&self, raw: &[u8]) -> Result<Self::Data, AdapterError>;
}

/// `serde_json` encoding for any serde type.
pub struct JsonDataAdapter<D> {
    marker: PhantomData<fn() -> D>,
}

impl<D> JsonDataAdapter<D> {
    pub fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<D> Default for JsonDataAdapter<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> RawDataAdapter for JsonDataAdapter<D>
where
    D: Serialize + DeserializeOwned + Send + Sync,
{
    type Data = D;

    fn serialize(&self, data: &D) -> Result<Vec<u8>, AdapterError> {
        Ok(serde_json::to_vec(data)?)
    }

    fn deserialize(&self, raw: &[u8]) -> Result<D, AdapterError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// Converts a [`Model`] to and from a key-value item.
pub trait ModelAdapter<K, P>: Send + Sync {
    fn key_document(&self, key: &K) -> Result<Document, AdapterError>;

    fn to_item(&self, model: &Model<K, P>) -> Result<Document, AdapterError>;

    fn from_item(&self, item: Document) -> Result<Model<K, P>, AdapterError>;
}

/// Stores key fields and property fields side by side in one document.
///
/// Both halves must serialize to JSON objects. On the way back each half is
/// read from the whole item, so key and property types should ignore fields
/// that belong to the other half (serde's default).
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleModelAdapter;

impl SimpleModelAdapter {
    fn object<T: Serialize>(value: &T, half: &str) -> Result<Document, AdapterError> {
        match serde_json::to_value(value)? {
            Value::Object(fields) => Ok(fields),
            other => Err(format!("{half} must serialize to an object, got {other}").into()),
        }
    }
}

impl<K, P> ModelAdapter<K, P> for SimpleModelAdapter
where
    K: Serialize + DeserializeOwned,
    P: Serialize + DeserializeOwned,
{
    fn key_document(&self, key: &K) -> Result<Document, AdapterError> {
        Self::object(key, "key")
    }

    fn to_item(&self, model: &Model<K, P>) -> Result<Document, AdapterError> {
        let mut item = Self::object(&model.properties, "properties")?;
        item.extend(Self::object(&model.key, "key")?);
        Ok(item)
    }

    fn from_item(&self, item: Document) -> Result<Model<K, P>, AdapterError> {
        let item = Value::Object(item);
        Ok(Model::new(
            K::deserialize(&item)?,
            P::deserialize(&item)?,
        ))
    }
}

pub(crate) fn adapter_fault(
    fault: StorageFault,
    message: &str,
    backend: &str,
    cause: AdapterError,
) -> ServiceError {
    ServiceError::storage(fault, message, backend).with_boxed_cause(cause)
}
