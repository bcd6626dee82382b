//! Stored record container

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::StoreError;

/// Named container of simple and map fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record name
    pub id: String,

    /// Scalar fields
    #[serde(default)]
    pub simple_fields: HashMap<String, String>,

    /// Nested string maps, one per field name
    #[serde(default)]
    pub map_fields: HashMap<String, HashMap<String, String>>,
}

impl Record {
    /// Create an empty record
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    /// Deserialize from the JSON wire form
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::DeserializationError(e.to_string()))
    }
}
