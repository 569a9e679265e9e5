//! Record model: a required positive integer `id` plus an open map of
//! client-defined fields that are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;

pub type Fields = Map<String, Value>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: u64,
    #[serde(flatten)]
    fields: Fields,
}

impl Record {
    /// Build a record with the given id. Any `id` key in `fields` is dropped.
    pub fn new(id: u64, mut fields: Fields) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Shallow merge: `patch` wins per field, absent fields are kept, `id` never changes.
    pub fn merge(&mut self, patch: Fields) {
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            self.fields.insert(key, value);
        }
    }
}

/// Create input: a single object or an array of objects.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePayload {
    One(Fields),
    Many(Vec<Fields>),
}

impl CreatePayload {
    pub fn into_items(self) -> Vec<Fields> {
        match self {
            Self::One(fields) => vec![fields],
            Self::Many(items) => items,
        }
    }
}

impl TryFrom<Value> for CreatePayload {
    type Error = ServiceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self::One(fields)),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(fields) => Ok(fields),
                    _ => Err(ServiceError::Validation(format!("item {i} is not a JSON object"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            _ => Err(ServiceError::Validation("payload must be a JSON object or an array of objects".into())),
        }
    }
}

/// Coerce an update body into a field map.
pub fn patch_from_value(value: Value) -> Result<Fields, ServiceError> {
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(ServiceError::Validation("update payload must be a JSON object".into())),
    }
}

/// Create output mirrors the payload shape.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Created {
    One(Record),
    Many(Vec<Record>),
}

impl Created {
    pub fn records(&self) -> &[Record] {
        match self {
            Self::One(record) => std::slice::from_ref(record),
            Self::Many(records) => records,
        }
    }
}
