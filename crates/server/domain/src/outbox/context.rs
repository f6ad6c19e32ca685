//! Event context container.
//!
//! The payload of an event record is an open mapping with string keys and a
//! closed set of value kinds. It is opaque to the relay itself and is
//! serialized to a canonical JSON encoding (sorted keys) when a record is
//! transformed into a sink row.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error raised when a stored payload cannot be turned into a sink row.
///
/// Transform failures are per-record: the record is skipped for the current
/// cycle and stays pending for a later one, it is never dropped.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("event context is not a JSON object")]
    NotAnObject,

    #[error("unsupported value kind at '{key}'")]
    UnsupportedValue { key: String },

    #[error("context serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single value inside an event context.
///
/// JSON `null` is deliberately not representable; payloads containing it
/// fail transform instead of silently degrading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Float(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

/// The structured payload of one event record.
///
/// Backed by a `BTreeMap` so the canonical JSON encoding has a stable key
/// order regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventContext(BTreeMap<String, ContextValue>);

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize to the canonical transport encoding (JSON, sorted keys).
    pub fn to_canonical_json(&self) -> Result<String, TransformError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Convert to a raw JSON value for JSONB storage.
    pub fn to_value(&self) -> Result<serde_json::Value, TransformError> {
        Ok(serde_json::to_value(&self.0)?)
    }

    /// Rebuild a context from a raw JSON value read back from storage.
    ///
    /// Fails if the value is not an object or contains a value kind outside
    /// the closed set (e.g. `null`).
    pub fn from_value(value: serde_json::Value) -> Result<Self, TransformError> {
        let serde_json::Value::Object(entries) = value else {
            return Err(TransformError::NotAnObject);
        };

        let mut map = BTreeMap::new();
        for (key, entry) in entries {
            let converted = context_value_from_json(&key, entry)?;
            map.insert(key, converted);
        }
        Ok(Self(map))
    }
}

impl FromIterator<(String, ContextValue)> for EventContext {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn context_value_from_json(
    key: &str,
    value: serde_json::Value,
) -> Result<ContextValue, TransformError> {
    match value {
        serde_json::Value::Bool(b) => Ok(ContextValue::Bool(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(ContextValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(ContextValue::Float(f))
            } else {
                Err(TransformError::UnsupportedValue {
                    key: key.to_string(),
                })
            }
        }
        serde_json::Value::String(s) => Ok(ContextValue::String(s)),
        serde_json::Value::Array(items) => {
            let converted = items
                .into_iter()
                .map(|item| context_value_from_json(key, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ContextValue::Sequence(converted))
        }
        serde_json::Value::Object(entries) => {
            let mut map = BTreeMap::new();
            for (nested_key, entry) in entries {
                let converted = context_value_from_json(&nested_key, entry)?;
                map.insert(nested_key, converted);
            }
            Ok(ContextValue::Map(map))
        }
        serde_json::Value::Null => Err(TransformError::UnsupportedValue {
            key: key.to_string(),
        }),
    }
}
