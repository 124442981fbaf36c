//! Type lifecycle: insert, evolve, and link type schemas.
//!
//! Types are created on first put and afterwards only grow: properties can be
//! added under the compatibility flags, never removed or retyped, and the
//! single-parent base-type link is written once.

use crate::mao::MetadataAccessObject;
use crate::schema::{SystemBaseType, TypeDef, TypeKind};
use crate::{StoreError, StoreResult};

/// Normalizes the version carried by a type request: an empty string means
/// the caller did not ask for a versioned type.
pub(crate) fn request_type_version(version: Option<&str>) -> Option<&str> {
    version.filter(|version| !version.is_empty())
}

/// Checks `stored` and `given` describe the same type and computes the merged
/// property schema.
///
/// Properties present in both must agree on the primitive kind. Properties
/// only in `stored` count as omitted and need `can_omit_fields`; properties
/// only in `given` need `can_add_fields`. The merged schema is `stored` plus
/// the additions from `given`.
pub(crate) fn check_fields_consistent(
    stored: &TypeDef,
    given: &TypeDef,
    can_add_fields: bool,
    can_omit_fields: bool,
) -> StoreResult<TypeDef> {
    if stored.name != given.name {
        return Err(StoreError::failed_precondition(format!(
            "conflicting type name found in stored and given types: stored `{}`, given `{}`",
            stored.name, given.name
        )));
    }
    let mut omitted_fields = 0usize;
    for (name, stored_kind) in &stored.properties {
        match given.properties.get(name) {
            None => omitted_fields += 1,
            Some(given_kind) if given_kind != stored_kind => {
                return Err(StoreError::failed_precondition(format!(
                    "conflicting value type for property `{name}` of type `{}`: stored {:?}, given {:?}",
                    stored.name, stored_kind, given_kind
                )));
            }
            Some(_) => {}
        }
        if omitted_fields > 0 && !can_omit_fields {
            return Err(StoreError::failed_precondition(format!(
                "can_omit_fields is false while the stored type `{}` has more properties",
                stored.name
            )));
        }
    }
    if stored.properties.len() - omitted_fields == given.properties.len() {
        return Ok(stored.clone());
    }
    if !can_add_fields {
        return Err(StoreError::failed_precondition(format!(
            "can_add_fields is false while the given type `{}` has more properties",
            given.name
        )));
    }
    let mut output = stored.clone();
    for (name, kind) in &given.properties {
        output
            .properties
            .entry(name.clone())
            .or_insert(*kind);
    }
    Ok(output)
}

/// Reconciles the base-type link of `type_id` with the `base_type` field of
/// the request.
///
/// No field means no-op. The explicit unset sentinel asks for link deletion,
/// which is unimplemented. Otherwise a missing link is created, an equal link
/// is left alone, a different link is an unimplemented update, and several
/// stored links violate the single-parent invariant.
pub(crate) async fn upsert_type_inheritance_link(
    mao: &dyn MetadataAccessObject,
    kind: TypeKind,
    type_def: &TypeDef,
    type_id: i64,
) -> StoreResult<()> {
    let Some(base_type) = type_def.base_type else {
        return Ok(());
    };
    if base_type == SystemBaseType::Unset {
        return Err(StoreError::unimplemented(
            "base_type deletion is not supported yet",
        ));
    }
    let base_name = base_type.type_name()?;
    let parents = mao.find_parent_types_by_type_ids(kind, &[type_id]).await?;
    match parents.get(&type_id).map(Vec::as_slice) {
        None | Some([]) => {
            let mut child = type_def.clone();
            child.id = Some(type_id);
            let parent = mao
                .find_type_by_name_and_version(kind, base_name, None)
                .await?;
            mao.create_parent_type_link(kind, &child, &parent).await
        }
        Some([parent]) if parent.name == base_name => Ok(()),
        Some([_]) => Err(StoreError::unimplemented(
            "base_type update is not supported yet",
        )),
        Some(_) => Err(StoreError::failed_precondition(format!(
            "{} type {type_id} has more than one parent type",
            kind.label()
        ))),
    }
}

/// Inserts a type or evolves an existing one, returning its id.
///
/// A type whose `(name, version)` is unknown is created; `can_add_fields` is
/// ignored on that path. When the pair is known the schemas are checked for
/// consistency and an incompatible request fails with AlreadyExists, the
/// deliberate surface code for "exists but differs".
pub(crate) async fn upsert_type(
    mao: &dyn MetadataAccessObject,
    kind: TypeKind,
    type_def: &TypeDef,
    can_add_fields: bool,
    can_omit_fields: bool,
) -> StoreResult<i64> {
    let stored = match mao
        .find_type_by_name_and_version(
            kind,
            &type_def.name,
            request_type_version(type_def.version.as_deref()),
        )
        .await
    {
        Ok(stored) => stored,
        Err(err) if err.is_not_found() => {
            let type_id = mao.create_type(kind, type_def).await?;
            upsert_type_inheritance_link(mao, kind, type_def, type_id).await?;
            return Ok(type_id);
        }
        Err(err) => return Err(err),
    };
    let type_id = stored.id.ok_or_else(|| {
        StoreError::internal(format!("stored type `{}` has no id", stored.name))
    })?;
    let output = check_fields_consistent(&stored, type_def, can_add_fields, can_omit_fields)
        .map_err(|err| {
            StoreError::already_exists(format!(
                "type already exists with different properties: {err}"
            ))
        })?;
    mao.update_type(kind, &output).await?;
    upsert_type_inheritance_link(mao, kind, type_def, type_id).await?;
    Ok(type_id)
}

/// Upserts every type in the three kind lists, in input order, and returns
/// the assigned ids per kind.
pub(crate) async fn upsert_type_batch(
    mao: &dyn MetadataAccessObject,
    artifact_types: &[TypeDef],
    execution_types: &[TypeDef],
    context_types: &[TypeDef],
    can_add_fields: bool,
    can_omit_fields: bool,
) -> StoreResult<(Vec<i64>, Vec<i64>, Vec<i64>)> {
    let mut artifact_type_ids = Vec::with_capacity(artifact_types.len());
    for type_def in artifact_types {
        artifact_type_ids
            .push(upsert_type(mao, TypeKind::Artifact, type_def, can_add_fields, can_omit_fields).await?);
    }
    let mut execution_type_ids = Vec::with_capacity(execution_types.len());
    for type_def in execution_types {
        execution_type_ids
            .push(upsert_type(mao, TypeKind::Execution, type_def, can_add_fields, can_omit_fields).await?);
    }
    let mut context_type_ids = Vec::with_capacity(context_types.len());
    for type_def in context_types {
        context_type_ids
            .push(upsert_type(mao, TypeKind::Context, type_def, can_add_fields, can_omit_fields).await?);
    }
    Ok((artifact_type_ids, execution_type_ids, context_type_ids))
}

/// Hydrates the `base_type` field of fetched types from their stored parent
/// links. Types without a link are left untouched.
pub(crate) async fn set_base_types(
    mao: &dyn MetadataAccessObject,
    kind: TypeKind,
    types: &mut [TypeDef],
) -> StoreResult<()> {
    if types.is_empty() {
        return Ok(());
    }
    let type_ids: Vec<i64> = types.iter().filter_map(|type_def| type_def.id).collect();
    let parents = mao.find_parent_types_by_type_ids(kind, &type_ids).await?;
    for type_def in types.iter_mut() {
        let Some(type_id) = type_def.id else { continue };
        match parents.get(&type_id).map(Vec::as_slice) {
            None | Some([]) => {}
            Some([parent]) => {
                type_def.base_type = Some(SystemBaseType::from_type_name(&parent.name)?);
            }
            Some(_) => {
                return Err(StoreError::failed_precondition(format!(
                    "{} type {type_id} has more than one parent type",
                    kind.label()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyType;

    fn type_with(name: &str, properties: &[(&str, PropertyType)]) -> TypeDef {
        let mut type_def = TypeDef::new(name);
        for (property, kind) in properties {
            type_def.properties.insert((*property).to_string(), *kind);
        }
        type_def
    }

    #[test]
    fn merge_is_union_when_fields_can_be_added() {
        let stored = type_with("Model", &[("a", PropertyType::Int)]);
        let given = type_with("Model", &[("a", PropertyType::Int), ("b", PropertyType::String)]);
        let output = check_fields_consistent(&stored, &given, true, false).unwrap();
        assert_eq!(output.properties.len(), 2);
        assert_eq!(output.properties["b"], PropertyType::String);
    }

    #[test]
    fn identical_schemas_need_no_flags() {
        let stored = type_with("Model", &[("a", PropertyType::Int)]);
        let output = check_fields_consistent(&stored, &stored.clone(), false, false).unwrap();
        assert_eq!(output, stored);
    }

    #[test]
    fn conflicting_value_type_fails_regardless_of_flags() {
        let stored = type_with("Model", &[("a", PropertyType::Int)]);
        let given = type_with("Model", &[("a", PropertyType::String)]);
        let err = check_fields_consistent(&stored, &given, true, true).unwrap_err();
        assert!(err.is_failed_precondition());
    }

    #[test]
    fn omitted_properties_require_the_omit_flag() {
        let stored = type_with("Model", &[("a", PropertyType::Int), ("b", PropertyType::Double)]);
        let given = type_with("Model", &[("a", PropertyType::Int)]);
        assert!(check_fields_consistent(&stored, &given, false, false).is_err());
        let output = check_fields_consistent(&stored, &given, false, true).unwrap();
        // Omission never removes stored properties.
        assert_eq!(output.properties.len(), 2);
    }

    #[test]
    fn added_properties_require_the_add_flag() {
        let stored = type_with("Model", &[("a", PropertyType::Int)]);
        let given = type_with("Model", &[("a", PropertyType::Int), ("b", PropertyType::Double)]);
        let err = check_fields_consistent(&stored, &given, false, false).unwrap_err();
        assert!(err.is_failed_precondition());
    }

    #[test]
    fn name_mismatch_is_a_precondition_failure() {
        let stored = type_with("Model", &[]);
        let given = type_with("Dataset", &[]);
        let err = check_fields_consistent(&stored, &given, true, true).unwrap_err();
        assert!(err.is_failed_precondition());
    }

    #[test]
    fn empty_request_version_reads_as_unversioned() {
        assert_eq!(request_type_version(None), None);
        assert_eq!(request_type_version(Some("")), None);
        assert_eq!(request_type_version(Some("v1")), Some("v1"));
    }
}
