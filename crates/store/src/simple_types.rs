//! Built-in "simple" types seeded when a store is initialised.
//!
//! Simple types back the system-defined base types and are hidden from bulk
//! type listings; direct lookup by name still returns them.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::schema::TypeDef;

pub const SIMPLE_ARTIFACT_TYPE_NAMES: [&str; 4] = [
    "lineal.Dataset",
    "lineal.Model",
    "lineal.Metrics",
    "lineal.Statistics",
];

pub const SIMPLE_EXECUTION_TYPE_NAMES: [&str; 5] = [
    "lineal.Train",
    "lineal.Transform",
    "lineal.Process",
    "lineal.Evaluate",
    "lineal.Deploy",
];

static SIMPLE_TYPE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    SIMPLE_ARTIFACT_TYPE_NAMES
        .iter()
        .chain(SIMPLE_EXECUTION_TYPE_NAMES.iter())
        .copied()
        .collect()
});

pub fn is_simple_type_name(name: &str) -> bool {
    SIMPLE_TYPE_NAMES.contains(name)
}

pub fn simple_artifact_types() -> Vec<TypeDef> {
    SIMPLE_ARTIFACT_TYPE_NAMES
        .iter()
        .map(|name| TypeDef::new(*name))
        .collect()
}

pub fn simple_execution_types() -> Vec<TypeDef> {
    SIMPLE_EXECUTION_TYPE_NAMES
        .iter()
        .map(|name| TypeDef::new(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_names_cover_both_kinds() {
        assert!(is_simple_type_name("lineal.Dataset"));
        assert!(is_simple_type_name("lineal.Deploy"));
        assert!(!is_simple_type_name("Model"));
    }
}
