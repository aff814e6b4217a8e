use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::block::is_set;

/// Flat `field name -> value` record extracted from, or used to hydrate, a block tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord(Map<String, Value>);

impl StructuredRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field. An existing field keeps its position.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// True when the field is present with a non-null value.
    pub fn is_set(&self, field: &str) -> bool {
        is_set(self.0.get(field))
    }

    /// Merge `other` into this record. Fields of `other` win.
    pub fn merge(&mut self, other: StructuredRecord) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for StructuredRecord {
    fn from(map: Map<String, Value>) -> Self {
        StructuredRecord(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for StructuredRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        StructuredRecord(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
