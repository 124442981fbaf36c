use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primitive value kind a type declares for one of its properties.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Int,
    Double,
    String,
    Struct,
}

/// A property value attached to an artifact, execution, or context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Int(i64),
    Double(f64),
    String(String),
    Struct(serde_json::Value),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Int(_) => PropertyType::Int,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Struct(_) => PropertyType::Struct,
        }
    }
}

/// Property maps use a BTreeMap so iteration and serialization are stable.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Declared property schema of a type: property name to primitive kind.
pub type PropertySchema = BTreeMap<String, PropertyType>;
