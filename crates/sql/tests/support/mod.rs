#![allow(dead_code)]

use lineal_sql::{open_store, LinealConfig, SqlTransactionExecutor};
use lineal_store::{
    MetadataStore, MigrationOptions, PropertyType, PutArtifactTypeRequest, PutTypesRequest,
    TypeDef,
};
use tempfile::TempDir;

pub type SqlStore = MetadataStore<SqlTransactionExecutor>;

/// Opens a fresh sqlite-backed store in a temporary directory. The directory
/// must outlive the store, so it is handed back to the caller.
pub async fn new_store() -> (TempDir, SqlStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LinealConfig::default_sqlite(
        dir.path().join("lineal.sqlite").to_string_lossy().to_string(),
    );
    let store = open_store(&config, dir.path(), &MigrationOptions::default())
        .await
        .expect("open store");
    (dir, store)
}

pub fn typed(name: &str, properties: &[(&str, PropertyType)]) -> TypeDef {
    let mut type_def = TypeDef::new(name);
    for (property, kind) in properties {
        type_def.properties.insert((*property).to_string(), *kind);
    }
    type_def
}

pub async fn put_artifact_type(store: &SqlStore, type_def: TypeDef) -> i64 {
    store
        .put_artifact_type(PutArtifactTypeRequest {
            artifact_type: type_def,
            can_add_fields: true,
            ..PutArtifactTypeRequest::default()
        })
        .await
        .expect("put artifact type")
        .type_id
}

/// Registers one type of each kind and returns their ids as
/// `(artifact, execution, context)`.
pub async fn seed_graph_types(store: &SqlStore) -> (i64, i64, i64) {
    let response = store
        .put_types(PutTypesRequest {
            artifact_types: vec![typed("Data", &[])],
            execution_types: vec![typed("Trainer", &[])],
            context_types: vec![typed("Experiment", &[])],
            ..PutTypesRequest::default()
        })
        .await
        .expect("seed types");
    (
        response.artifact_type_ids[0],
        response.execution_type_ids[0],
        response.context_type_ids[0],
    )
}
