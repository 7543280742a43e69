//! Caller options and the native request fields they map to.
//!
//! Every backend operation declares an explicit allow-list of
//! `option name → native field`. Options outside the list are rejected instead
//! of being forwarded blindly, and fields whose native spelling is not a
//! simple capitalization (`acl → ACL`) are spelled out in the list.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{BackendError, ServiceError};
use crate::result::ServiceResult;

pub type FieldMap = &'static [(&'static str, &'static str)];

/// Open-ended options supplied by the caller of a storage operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionBag {
    entries: BTreeMap<String, Value>,
}

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<const N: usize> From<[(&str, Value); N]> for OptionBag {
    fn from(entries: [(&str, Value); N]) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

/// Native request fields, keyed by the backend's own field names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeParams {
    fields: BTreeMap<&'static str, Value>,
}

impl NativeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, value: Value) {
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn string(&self, field: &str) -> Result<Option<String>, BackendError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(type_mismatch(field, "a string")),
        }
    }

    pub fn boolean(&self, field: &str) -> Result<Option<bool>, BackendError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(type_mismatch(field, "a boolean")),
        }
    }

    pub fn object(&self, field: &str) -> Result<Option<&Map<String, Value>>, BackendError> {
        match self.fields.get(field) {
            None => Ok(None),
            Some(Value::Object(value)) => Ok(Some(value)),
            Some(_) => Err(type_mismatch(field, "an object")),
        }
    }

    pub fn string_map(&self, field: &str) -> Result<Option<BTreeMap<String, String>>, BackendError> {
        let Some(object) = self.object(field)? else {
            return Ok(None);
        };
        object
            .iter()
            .map(|(name, value)| match value {
                Value::String(text) => Ok((name.clone(), text.clone())),
                _ => Err(type_mismatch(field, "an object of strings")),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Some)
    }
}

impl<const N: usize> From<[(&'static str, Value); N]> for NativeParams {
    fn from(fields: [(&'static str, Value); N]) -> Self {
        Self {
            fields: BTreeMap::from(fields),
        }
    }
}

fn type_mismatch(field: &str, expected: &str) -> BackendError {
    BackendError::with_code("ValidationException", format!("{field} must be {expected}"))
}

/// Maps caller options onto native fields using `allowed`.
pub fn map_options(backend: &str, allowed: FieldMap, options: &OptionBag) -> ServiceResult<NativeParams> {
    let mut params = NativeParams::new();
    for (name, value) in options.iter() {
        let Some((_, field)) = allowed.iter().find(|(option, _)| *option == name) else {
            return Err(ServiceError::not_supported(
                format!("option '{name}' is not supported by {backend}"),
                backend,
            )
            .into());
        };
        params.insert(*field, value.clone());
    }
    Ok(params)
}
