use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{
    AttributeValue, ReturnConsumedCapacity, ReturnItemCollectionMetrics, ReturnValue,
};
use base64::Engine;
use serde_json::{Number, Value};
use service_model_core::error::BackendError;
use service_model_core::storage::{Document, ItemRequest, KeyValueClient, NativeParams};

use super::sdk_error;

pub type Item = HashMap<String, AttributeValue>;

pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(fields) => AttributeValue::M(to_item(fields)),
    }
}

pub fn to_item(document: &Document) -> Item {
    document
        .iter()
        .map(|(name, value)| (name.clone(), to_attribute(value)))
        .collect()
}

/// Binary attributes come back as standard base64 strings.
pub fn from_attribute(attribute: &AttributeValue) -> Result<Value, BackendError> {
    let value = match attribute {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => parse_number(number)?,
        AttributeValue::B(blob) => Value::String(encode_blob(blob)),
        AttributeValue::Ss(texts) => texts.iter().cloned().map(Value::String).collect(),
        AttributeValue::Ns(numbers) => numbers
            .iter()
            .map(|number| parse_number(number))
            .collect::<Result<Vec<_>, _>>()?
            .into(),
        AttributeValue::Bs(blobs) => blobs
            .iter()
            .map(|blob| Value::String(encode_blob(blob)))
            .collect(),
        AttributeValue::L(items) => items
            .iter()
            .map(from_attribute)
            .collect::<Result<Vec<_>, _>>()?
            .into(),
        AttributeValue::M(fields) => Value::Object(from_item(fields)?),
        other => {
            return Err(BackendError::with_code(
                "UnsupportedAttribute",
                format!("unsupported attribute value: {other:?}"),
            ))
        }
    };
    Ok(value)
}

pub fn from_item(item: &Item) -> Result<Document, BackendError> {
    item.iter()
        .map(|(name, attribute)| -> Result<(String, Value), BackendError> {
            Ok((name.clone(), from_attribute(attribute)?))
        })
        .collect()
}

fn parse_number(raw: &str) -> Result<Value, BackendError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::from(integer));
    }
    if let Ok(unsigned) = raw.parse::<u64>() {
        return Ok(Value::from(unsigned));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            BackendError::with_code("UnsupportedAttribute", format!("invalid number: {raw}"))
        })
}

fn encode_blob(blob: &Blob) -> String {
    base64::engine::general_purpose::STANDARD.encode(blob)
}

fn attribute_names(
    params: &NativeParams,
) -> Result<Option<HashMap<String, String>>, BackendError> {
    Ok(params
        .string_map("ExpressionAttributeNames")?
        .map(|names| names.into_iter().collect()))
}

fn attribute_values(params: &NativeParams) -> Result<Option<Item>, BackendError> {
    Ok(params.object("ExpressionAttributeValues")?.map(to_item))
}

fn consumed_capacity(
    params: &NativeParams,
) -> Result<Option<ReturnConsumedCapacity>, BackendError> {
    Ok(params
        .string("ReturnConsumedCapacity")?
        .map(|value| ReturnConsumedCapacity::from(value.as_str())))
}

fn return_values(params: &NativeParams) -> Result<Option<ReturnValue>, BackendError> {
    Ok(params
        .string("ReturnValues")?
        .map(|value| ReturnValue::from(value.as_str())))
}

fn collection_metrics(
    params: &NativeParams,
) -> Result<Option<ReturnItemCollectionMetrics>, BackendError> {
    Ok(params
        .string("ReturnItemCollectionMetrics")?
        .map(|value| ReturnItemCollectionMetrics::from(value.as_str())))
}

fn returned(attributes: Option<&Item>) -> Result<Option<Document>, BackendError> {
    attributes.map(from_item).transpose()
}

/// [`KeyValueClient`] over `aws-sdk-dynamodb`.
#[derive(Debug, Clone)]
pub struct DynamoDbClient {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbClient {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_dynamodb::Client::new(config))
    }
}

#[async_trait]
impl KeyValueClient for DynamoDbClient {
    async fn get_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError> {
        let params = &request.params;
        let output = self
            .client
            .get_item()
            .table_name(&request.table_name)
            .set_key(request.key.as_ref().map(to_item))
            .set_consistent_read(params.boolean("ConsistentRead")?)
            .set_projection_expression(params.string("ProjectionExpression")?)
            .set_expression_attribute_names(attribute_names(params)?)
            .set_return_consumed_capacity(consumed_capacity(params)?)
            .send()
            .await
            .map_err(sdk_error)?;

        returned(output.item())
    }

    async fn put_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError> {
        let params = &request.params;
        let output = self
            .client
            .put_item()
            .table_name(&request.table_name)
            .set_item(request.item.as_ref().map(to_item))
            .set_condition_expression(params.string("ConditionExpression")?)
            .set_expression_attribute_names(attribute_names(params)?)
            .set_expression_attribute_values(attribute_values(params)?)
            .set_return_values(return_values(params)?)
            .set_return_consumed_capacity(consumed_capacity(params)?)
            .set_return_item_collection_metrics(collection_metrics(params)?)
            .send()
            .await
            .map_err(sdk_error)?;

        returned(output.attributes())
    }

    async fn update_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError> {
        let params = &request.params;
        let output = self
            .client
            .update_item()
            .table_name(&request.table_name)
            .set_key(request.key.as_ref().map(to_item))
            .set_update_expression(params.string("UpdateExpression")?)
            .set_condition_expression(params.string("ConditionExpression")?)
            .set_expression_attribute_names(attribute_names(params)?)
            .set_expression_attribute_values(attribute_values(params)?)
            .set_return_values(return_values(params)?)
            .set_return_consumed_capacity(consumed_capacity(params)?)
            .set_return_item_collection_metrics(collection_metrics(params)?)
            .send()
            .await
            .map_err(sdk_error)?;

        returned(output.attributes())
    }

    async fn delete_item(&self, request: ItemRequest) -> Result<Option<Document>, BackendError> {
        let params = &request.params;
        let output = self
            .client
            .delete_item()
            .table_name(&request.table_name)
            .set_key(request.key.as_ref().map(to_item))
            .set_condition_expression(params.string("ConditionExpression")?)
            .set_expression_attribute_names(attribute_names(params)?)
            .set_expression_attribute_values(attribute_values(params)?)
            .set_return_values(return_values(params)?)
            .set_return_consumed_capacity(consumed_capacity(params)?)
            .set_return_item_collection_metrics(collection_metrics(params)?)
            .send()
            .await
            .map_err(sdk_error)?;

        returned(output.attributes())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(fields) => fields,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn json_document_converts_to_attribute_values() {
        let item = to_item(&document(json!({
            "id": "id",
            "visits": 3,
            "active": true,
            "note": null,
            "tags": ["a", 1],
            "profile": {"name": "client"}
        })));

        assert_eq!(item["id"], AttributeValue::S("id".into()));
        assert_eq!(item["visits"], AttributeValue::N("3".into()));
        assert_eq!(item["active"], AttributeValue::Bool(true));
        assert_eq!(item["note"], AttributeValue::Null(true));
        assert_eq!(
            item["tags"],
            AttributeValue::L(vec![
                AttributeValue::S("a".into()),
                AttributeValue::N("1".into())
            ])
        );
        assert_eq!(
            item["profile"],
            AttributeValue::M(HashMap::from([(
                "name".to_string(),
                AttributeValue::S("client".into())
            )]))
        );
    }

    #[test]
    fn attribute_values_convert_back_to_json() {
        let original = document(json!({
            "id": "id",
            "visits": 3,
            "ratio": 0.5,
            "big": 18446744073709551615u64,
            "tags": ["a", "b"],
            "profile": {"name": "client", "active": false}
        }));

        let restored = from_item(&to_item(&original)).expect("item should convert");

        assert_eq!(restored, original);
    }

    #[test]
    fn sets_and_binaries_become_arrays_and_base64() {
        let item = Item::from([
            (
                "names".to_string(),
                AttributeValue::Ss(vec!["a".into(), "b".into()]),
            ),
            (
                "scores".to_string(),
                AttributeValue::Ns(vec!["1".into(), "2.5".into()]),
            ),
            ("raw".to_string(), AttributeValue::B(Blob::new(b"client".to_vec()))),
        ]);

        let restored = from_item(&item).expect("item should convert");

        assert_eq!(
            Value::Object(restored),
            json!({"names": ["a", "b"], "scores": [1, 2.5], "raw": "Y2xpZW50"})
        );
    }

    #[test]
    fn malformed_number_is_reported() {
        let error = from_attribute(&AttributeValue::N("one".into())).expect_err("not a number");

        assert!(error.has_code("UnsupportedAttribute"));
    }
}
