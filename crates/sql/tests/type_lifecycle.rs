mod support;

use lineal_store::{
    GetArtifactTypeRequest, GetArtifactTypesByIdRequest, GetArtifactTypesRequest,
    GetContextTypeRequest, PropertyType, PutArtifactTypeRequest, PutContextTypeRequest,
    PutTypesRequest, StoreResult, SystemBaseType, TypeDef,
};
use support::{new_store, put_artifact_type, typed};

#[tokio::test]
async fn type_evolution_grows_the_schema_in_place() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[("a", PropertyType::Int)])).await;

    let wider = typed(
        "Model",
        &[("a", PropertyType::Int), ("b", PropertyType::String)],
    );
    assert_eq!(put_artifact_type(&store, wider).await, type_id);

    let fetched = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "Model".into(),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert_eq!(fetched.properties.len(), 2);
    assert_eq!(fetched.properties["b"], PropertyType::String);

    // Retyping a stored property fails no matter which flags are set.
    let err = store
        .put_artifact_type(PutArtifactTypeRequest {
            artifact_type: typed("Model", &[("a", PropertyType::String)]),
            can_add_fields: true,
            can_omit_fields: true,
            ..PutArtifactTypeRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    Ok(())
}

#[tokio::test]
async fn omitting_properties_needs_the_omit_flag() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    put_artifact_type(
        &store,
        typed("Model", &[("a", PropertyType::Int), ("b", PropertyType::Double)]),
    )
    .await;

    let narrow = typed("Model", &[("a", PropertyType::Int)]);
    let err = store
        .put_artifact_type(PutArtifactTypeRequest {
            artifact_type: narrow.clone(),
            ..PutArtifactTypeRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    store
        .put_artifact_type(PutArtifactTypeRequest {
            artifact_type: narrow,
            can_omit_fields: true,
            ..PutArtifactTypeRequest::default()
        })
        .await?;
    // Omission never removes stored properties.
    let fetched = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "Model".into(),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert_eq!(fetched.properties.len(), 2);
    Ok(())
}

#[tokio::test]
async fn versioned_types_are_distinct_identities() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let unversioned = put_artifact_type(&store, typed("Model", &[])).await;
    let mut v1 = typed("Model", &[("a", PropertyType::Int)]);
    v1.version = Some("v1".into());
    let versioned = put_artifact_type(&store, v1).await;
    assert_ne!(unversioned, versioned);

    let fetched = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "Model".into(),
            type_version: Some("v1".into()),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert_eq!(fetched.id, Some(versioned));
    // An empty version string reads as the unversioned type.
    let fetched = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "Model".into(),
            type_version: Some(String::new()),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert_eq!(fetched.id, Some(unversioned));
    Ok(())
}

#[tokio::test]
async fn base_type_reconciliation_is_idempotent() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let mut training_data = typed("TrainingData", &[]);
    training_data.base_type = Some(SystemBaseType::Dataset);
    let type_id = put_artifact_type(&store, training_data.clone()).await;
    for _ in 0..3 {
        assert_eq!(put_artifact_type(&store, training_data.clone()).await, type_id);
    }

    let by_id = store
        .get_artifact_types_by_id(GetArtifactTypesByIdRequest {
            type_ids: vec![type_id],
            ..GetArtifactTypesByIdRequest::default()
        })
        .await?
        .artifact_types;
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].base_type, Some(SystemBaseType::Dataset));

    training_data.base_type = Some(SystemBaseType::Metrics);
    let err = store
        .put_artifact_type(PutArtifactTypeRequest {
            artifact_type: training_data,
            ..PutArtifactTypeRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_unimplemented());
    Ok(())
}

#[tokio::test]
async fn types_by_id_skip_unknown_ids() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    let fetched = store
        .get_artifact_types_by_id(GetArtifactTypesByIdRequest {
            type_ids: vec![type_id, 999_999],
            ..GetArtifactTypesByIdRequest::default()
        })
        .await?
        .artifact_types;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].id, Some(type_id));
    Ok(())
}

#[tokio::test]
async fn simple_types_are_seeded_once_and_hidden() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    // Re-running the conditional init must not duplicate the catalog.
    store.init_metadata_store_if_not_exists(false).await?;

    let listed = store
        .get_artifact_types(GetArtifactTypesRequest::default())
        .await?
        .artifact_types;
    assert!(listed.is_empty());

    let dataset = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "lineal.Dataset".into(),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert!(dataset.id.is_some());
    Ok(())
}

#[tokio::test]
async fn context_types_have_no_base_type_registry() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    store
        .put_context_type(PutContextTypeRequest {
            context_type: TypeDef::new("Experiment"),
            ..PutContextTypeRequest::default()
        })
        .await?;
    let fetched = store
        .get_context_type(GetContextTypeRequest {
            type_name: "Experiment".into(),
            ..GetContextTypeRequest::default()
        })
        .await?
        .context_type;
    assert_eq!(fetched.base_type, None);
    Ok(())
}

#[tokio::test]
async fn put_types_returns_ids_in_input_order() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let response = store
        .put_types(PutTypesRequest {
            artifact_types: vec![typed("A1", &[]), typed("A2", &[])],
            execution_types: vec![typed("E1", &[])],
            context_types: vec![typed("C1", &[])],
            ..PutTypesRequest::default()
        })
        .await?;
    assert_eq!(response.artifact_type_ids.len(), 2);
    assert!(response.artifact_type_ids[0] < response.artifact_type_ids[1]);
    assert_eq!(response.execution_type_ids.len(), 1);
    assert_eq!(response.context_type_ids.len(), 1);
    Ok(())
}
