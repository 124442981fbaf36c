mod support;

use lineal_sql::{open_store, LinealConfig};
use lineal_store::{
    Artifact, GetArtifactTypeRequest, GetArtifactsRequest, MigrationOptions, PutArtifactsRequest,
    StoreResult,
};
use support::{new_store, put_artifact_type, typed};

#[tokio::test]
async fn fresh_init_discards_data_and_reseeds_simple_types() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![Artifact {
                type_id: Some(type_id),
                ..Artifact::default()
            }],
            ..PutArtifactsRequest::default()
        })
        .await?;

    store.init_metadata_store().await?;

    let artifacts = store
        .get_artifacts(GetArtifactsRequest::default())
        .await?
        .artifacts;
    assert!(artifacts.is_empty());
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
async fn reopening_an_existing_database_keeps_data() -> StoreResult<()> {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LinealConfig::default_sqlite(
        dir.path().join("lineal.sqlite").to_string_lossy().to_string(),
    );
    {
        let store = open_store(&config, dir.path(), &MigrationOptions::default()).await?;
        put_artifact_type(&store, typed("Model", &[])).await;
    }
    let store = open_store(&config, dir.path(), &MigrationOptions::default()).await?;
    let fetched = store
        .get_artifact_type(GetArtifactTypeRequest {
            type_name: "Model".into(),
            ..GetArtifactTypeRequest::default()
        })
        .await?
        .artifact_type;
    assert!(fetched.id.is_some());
    Ok(())
}

#[tokio::test]
async fn downgrade_is_performed_and_surfaced_as_cancelled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LinealConfig::default_sqlite(
        dir.path().join("lineal.sqlite").to_string_lossy().to_string(),
    );
    open_store(&config, dir.path(), &MigrationOptions::default())
        .await
        .expect("initial open");

    let err = open_store(
        &config,
        dir.path(),
        &MigrationOptions {
            downgrade_to_schema_version: Some(0),
            ..MigrationOptions::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_cancelled());
    assert!(err.to_string().contains("schema version 0"));
}

#[tokio::test]
async fn downgrade_target_above_current_version_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LinealConfig::default_sqlite(
        dir.path().join("lineal.sqlite").to_string_lossy().to_string(),
    );
    open_store(&config, dir.path(), &MigrationOptions::default())
        .await
        .expect("initial open");

    let err = open_store(
        &config,
        dir.path(),
        &MigrationOptions {
            downgrade_to_schema_version: Some(99),
            ..MigrationOptions::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_invalid_argument());
}
