//! Flat records: the on-the-wire shape of persisted values.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;

/// A flat JSON object stored at one key.
///
/// Field values may be scalars, `null` or arrays, but never nested objects:
/// partial updates address records field by field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON value, checking that it is a flat object.
    pub fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Object(fields) => Self::from_fields(fields),
            other => Err(TypeError::NotARecord {
                found: json_kind(&other),
            }),
        }
    }

    /// Wrap a field map, checking that no field holds a nested object.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, TypeError> {
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.is_object()) {
            return Err(TypeError::NestedField {
                field: field.clone(),
            });
        }
        Ok(Self(fields))
    }

    /// Serialize any serde value into a record.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, TypeError> {
        let value =
            serde_json::to_value(value).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Self::from_value(value)
    }

    /// Deserialize the record into a serde type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TypeError> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = TypeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.0
    }
}

/// Human-readable name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
