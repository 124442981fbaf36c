use serde::{Deserialize, Serialize};

use crate::value::{PropertyMap, PropertySchema};
use crate::{StoreError, StoreResult};

/// Which family of entities a type describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Artifact,
    Execution,
    Context,
}

impl TypeKind {
    pub fn as_i16(self) -> i16 {
        match self {
            TypeKind::Artifact => 1,
            TypeKind::Execution => 2,
            TypeKind::Context => 3,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(TypeKind::Artifact),
            2 => Some(TypeKind::Execution),
            3 => Some(TypeKind::Context),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TypeKind::Artifact => "artifact",
            TypeKind::Execution => "execution",
            TypeKind::Context => "context",
        }
    }
}

/// System-defined base types a user type may inherit from.
///
/// `Unset` is an explicit sentinel carried by requests that ask for the
/// inheritance link to be removed, which the store rejects as unimplemented.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemBaseType {
    Unset,
    Dataset,
    Model,
    Metrics,
    Statistics,
    Train,
    Transform,
    Process,
    Evaluate,
    Deploy,
}

impl SystemBaseType {
    /// Name of the simple type backing this base type.
    pub fn type_name(self) -> StoreResult<&'static str> {
        match self {
            SystemBaseType::Unset => Err(StoreError::invalid_argument(
                "the unset base type has no backing type name",
            )),
            SystemBaseType::Dataset => Ok("lineal.Dataset"),
            SystemBaseType::Model => Ok("lineal.Model"),
            SystemBaseType::Metrics => Ok("lineal.Metrics"),
            SystemBaseType::Statistics => Ok("lineal.Statistics"),
            SystemBaseType::Train => Ok("lineal.Train"),
            SystemBaseType::Transform => Ok("lineal.Transform"),
            SystemBaseType::Process => Ok("lineal.Process"),
            SystemBaseType::Evaluate => Ok("lineal.Evaluate"),
            SystemBaseType::Deploy => Ok("lineal.Deploy"),
        }
    }

    /// Reverse mapping from a simple-type name, used when hydrating the
    /// `base_type` field of fetched types from stored parent links.
    pub fn from_type_name(name: &str) -> StoreResult<Self> {
        match name {
            "lineal.Dataset" => Ok(SystemBaseType::Dataset),
            "lineal.Model" => Ok(SystemBaseType::Model),
            "lineal.Metrics" => Ok(SystemBaseType::Metrics),
            "lineal.Statistics" => Ok(SystemBaseType::Statistics),
            "lineal.Train" => Ok(SystemBaseType::Train),
            "lineal.Transform" => Ok(SystemBaseType::Transform),
            "lineal.Process" => Ok(SystemBaseType::Process),
            "lineal.Evaluate" => Ok(SystemBaseType::Evaluate),
            "lineal.Deploy" => Ok(SystemBaseType::Deploy),
            other => Err(StoreError::internal(format!(
                "parent type `{other}` is not a known system type"
            ))),
        }
    }
}

/// Schema of one artifact, execution, or context type.
///
/// Identity is `(name, version)` within a kind. The kind itself is carried
/// by the storage calls rather than the struct, so the same shape serves all
/// three families.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub id: Option<i64>,
    pub name: String,
    pub version: Option<String>,
    pub description: Option<String>,
    pub properties: PropertySchema,
    pub base_type: Option<SystemBaseType>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDef {
            name: name.into(),
            ..TypeDef::default()
        }
    }
}

/// Checks declared properties of an entity against its type's schema.
///
/// Every declared property must be named by the schema and carry the declared
/// primitive kind. Custom properties are exempt and never reach this check.
pub fn validate_property_map(type_def: &TypeDef, properties: &PropertyMap) -> StoreResult<()> {
    for (name, value) in properties {
        match type_def.properties.get(name) {
            None => {
                return Err(StoreError::invalid_argument(format!(
                    "property `{name}` is not declared by type `{}`; store it as a custom property instead",
                    type_def.name
                )));
            }
            Some(declared) if *declared != value.property_type() => {
                return Err(StoreError::invalid_argument(format!(
                    "property `{name}` of type `{}` expects {:?}, got {:?}",
                    type_def.name,
                    declared,
                    value.property_type()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{PropertyType, PropertyValue};

    fn model_type() -> TypeDef {
        let mut type_def = TypeDef::new("Model");
        type_def.properties.insert("step".into(), PropertyType::Int);
        type_def
            .properties
            .insert("accuracy".into(), PropertyType::Double);
        type_def
    }

    #[test]
    fn validate_accepts_declared_properties() {
        let mut properties = PropertyMap::new();
        properties.insert("step".into(), PropertyValue::Int(7));
        assert!(validate_property_map(&model_type(), &properties).is_ok());
    }

    #[test]
    fn validate_rejects_undeclared_property() {
        let mut properties = PropertyMap::new();
        properties.insert("owner".into(), PropertyValue::String("a".into()));
        let err = validate_property_map(&model_type(), &properties).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn validate_rejects_mismatched_kind() {
        let mut properties = PropertyMap::new();
        properties.insert("step".into(), PropertyValue::String("7".into()));
        let err = validate_property_map(&model_type(), &properties).unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
