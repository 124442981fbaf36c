//! Contract of the data-access layer the store composes.
//!
//! Implementations own the physical access path (statement building, row
//! conversion, uniqueness enforcement) while the store supplies orchestration
//! and transaction discipline. All calls run inside the transaction scope the
//! executor established for the request.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::api::{LineageGraph, ListOperationOptions};
use crate::entities::{Artifact, Association, Attribution, Context, Event, Execution, ParentContext};
use crate::schema::{TypeDef, TypeKind};
use crate::StoreResult;

/// One page of a listing: the rows plus the token for the next page, when
/// more rows remain.
#[derive(Clone, Debug, Default)]
pub struct ListedPage<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

#[async_trait]
pub trait MetadataAccessObject: Send + Sync {
    // -- types ------------------------------------------------------------

    /// Inserts a new type and returns its id. InvalidArgument when the name
    /// is empty, AlreadyExists when `(name, version)` is taken for the kind.
    async fn create_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<i64>;

    /// Replaces the property schema of an existing type.
    async fn update_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<()>;

    /// NotFound when no type with the name and version exists for the kind.
    async fn find_type_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<TypeDef>;

    async fn find_type_id_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<i64>;

    /// Returns the types found among `type_ids`; missing ids are skipped.
    async fn find_types_by_ids(&self, kind: TypeKind, type_ids: &[i64]) -> StoreResult<Vec<TypeDef>>;

    /// All types of the kind, simple types included.
    async fn find_types(&self, kind: TypeKind) -> StoreResult<Vec<TypeDef>>;

    /// Records `parent` as the base type of `child`.
    async fn create_parent_type_link(
        &self,
        kind: TypeKind,
        child: &TypeDef,
        parent: &TypeDef,
    ) -> StoreResult<()>;

    /// Parent types keyed by child type id. Children without a parent are
    /// absent from the map; a child with several recorded parents maps to
    /// all of them.
    async fn find_parent_types_by_type_ids(
        &self,
        kind: TypeKind,
        type_ids: &[i64],
    ) -> StoreResult<HashMap<i64, Vec<TypeDef>>>;

    // -- artifacts --------------------------------------------------------

    async fn create_artifact(&self, artifact: &Artifact) -> StoreResult<i64>;

    async fn update_artifact(&self, artifact: &Artifact) -> StoreResult<()>;

    /// NotFound when any requested id does not exist.
    async fn find_artifacts_by_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Artifact>>;

    async fn find_artifacts(&self) -> StoreResult<Vec<Artifact>>;

    async fn list_artifacts(&self, options: &ListOperationOptions) -> StoreResult<ListedPage<Artifact>>;

    async fn find_artifacts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>>;

    async fn find_artifact_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Artifact>;

    async fn find_artifacts_by_uri(&self, uri: &str) -> StoreResult<Vec<Artifact>>;

    // -- executions -------------------------------------------------------

    async fn create_execution(&self, execution: &Execution) -> StoreResult<i64>;

    async fn update_execution(&self, execution: &Execution) -> StoreResult<()>;

    async fn find_executions_by_ids(&self, execution_ids: &[i64]) -> StoreResult<Vec<Execution>>;

    async fn find_executions(&self) -> StoreResult<Vec<Execution>>;

    async fn list_executions(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Execution>>;

    async fn find_executions_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>>;

    async fn find_execution_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Execution>;

    // -- contexts ---------------------------------------------------------

    /// AlreadyExists when the `(type_id, name)` pair is taken.
    async fn create_context(&self, context: &Context) -> StoreResult<i64>;

    async fn update_context(&self, context: &Context) -> StoreResult<()>;

    async fn find_contexts_by_ids(&self, context_ids: &[i64]) -> StoreResult<Vec<Context>>;

    async fn find_contexts(&self) -> StoreResult<Vec<Context>>;

    async fn list_contexts(&self, options: &ListOperationOptions) -> StoreResult<ListedPage<Context>>;

    async fn find_contexts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Context>>;

    async fn find_context_by_type_id_and_name(&self, type_id: i64, name: &str)
        -> StoreResult<Context>;

    // -- events -----------------------------------------------------------

    /// Both endpoint ids must be set and reference stored rows.
    async fn create_event(&self, event: &Event) -> StoreResult<i64>;

    async fn find_events_by_artifact_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Event>>;

    async fn find_events_by_execution_ids(&self, execution_ids: &[i64]) -> StoreResult<Vec<Event>>;

    // -- attribution / association / parent contexts ----------------------

    /// AlreadyExists when the pair is already linked.
    async fn create_association(&self, association: &Association) -> StoreResult<i64>;

    /// AlreadyExists when the pair is already linked.
    async fn create_attribution(&self, attribution: &Attribution) -> StoreResult<i64>;

    async fn find_contexts_by_artifact(&self, artifact_id: i64) -> StoreResult<Vec<Context>>;

    async fn find_contexts_by_execution(&self, execution_id: i64) -> StoreResult<Vec<Context>>;

    async fn find_artifacts_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>>;

    async fn find_executions_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>>;

    async fn create_parent_context(&self, parent_context: &ParentContext) -> StoreResult<()>;

    async fn find_parent_contexts_by_context_id(&self, context_id: i64)
        -> StoreResult<Vec<Context>>;

    async fn find_child_contexts_by_context_id(&self, context_id: i64) -> StoreResult<Vec<Context>>;

    // -- lineage ----------------------------------------------------------

    /// Expands the lineage subgraph reachable from `seed_artifacts` within
    /// `max_num_hops` hops, optionally capped at `max_node_size` nodes.
    async fn query_lineage_graph(
        &self,
        seed_artifacts: &[Artifact],
        max_num_hops: i64,
        max_node_size: Option<i64>,
        boundary_artifacts: Option<&str>,
        boundary_executions: Option<&str>,
    ) -> StoreResult<LineageGraph>;

    // -- lifecycle --------------------------------------------------------

    /// Creates a fresh schema, discarding whatever is present.
    async fn init_metadata_source(&self) -> StoreResult<()>;

    /// Creates the schema when absent. A present-but-stale schema is
    /// upgraded when `enable_upgrade_migration` is set and rejected with
    /// FailedPrecondition otherwise.
    async fn init_metadata_source_if_not_exists(
        &self,
        enable_upgrade_migration: bool,
    ) -> StoreResult<()>;

    /// Reverts the schema to `version`. InvalidArgument when `version`
    /// exceeds the current schema version.
    async fn downgrade_schema(&self, version: i64) -> StoreResult<()>;
}
