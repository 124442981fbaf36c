//! Request and response messages for every store operation.
//!
//! Each request carries the transaction options handed verbatim to the
//! transaction executor. Responses are built from scratch inside the unit of
//! work, so a retried transaction never observes stale output.

use serde::{Deserialize, Serialize};

use crate::entities::{Artifact, Association, Attribution, Context, Event, Execution, ParentContext};
use crate::schema::TypeDef;

/// Options passed through to the transaction executor for one request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// Free-form label surfaced in executor logs.
    pub tag: Option<String>,
}

/// Column a listing is ordered by.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderByField {
    Id,
    CreateTime,
    LastUpdateTime,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: OrderByField,
    pub is_asc: bool,
}

/// Paging and ordering options for list operations. A request without
/// options returns the full result set in id order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOperationOptions {
    pub max_result_size: Option<i32>,
    pub order_by: Option<OrderBy>,
    pub next_page_token: Option<String>,
}

/// Migration directives consumed when constructing a store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationOptions {
    pub enable_upgrade_migration: bool,
    /// When set, the schema is downgraded to this version and the
    /// construction fails with a cancellation signal.
    pub downgrade_to_schema_version: Option<i64>,
}

// ---------------------------------------------------------------------------
// Type writes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PutTypesRequest {
    pub artifact_types: Vec<TypeDef>,
    pub execution_types: Vec<TypeDef>,
    pub context_types: Vec<TypeDef>,
    pub can_add_fields: bool,
    pub can_omit_fields: bool,
    /// Only the all-fields-match mode is supported.
    pub all_fields_match: bool,
    pub transaction_options: TransactionOptions,
}

impl Default for PutTypesRequest {
    fn default() -> Self {
        PutTypesRequest {
            artifact_types: Vec::new(),
            execution_types: Vec::new(),
            context_types: Vec::new(),
            can_add_fields: false,
            can_omit_fields: false,
            all_fields_match: true,
            transaction_options: TransactionOptions::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutTypesResponse {
    pub artifact_type_ids: Vec<i64>,
    pub execution_type_ids: Vec<i64>,
    pub context_type_ids: Vec<i64>,
}

macro_rules! put_single_type_messages {
    ($request:ident, $response:ident, $field:ident) => {
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        pub struct $request {
            pub $field: TypeDef,
            pub can_add_fields: bool,
            pub can_omit_fields: bool,
            /// Only the all-fields-match mode is supported.
            pub all_fields_match: bool,
            pub transaction_options: TransactionOptions,
        }

        impl Default for $request {
            fn default() -> Self {
                $request {
                    $field: TypeDef::default(),
                    can_add_fields: false,
                    can_omit_fields: false,
                    all_fields_match: true,
                    transaction_options: TransactionOptions::default(),
                }
            }
        }

        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        pub struct $response {
            pub type_id: i64,
        }
    };
}

put_single_type_messages!(PutArtifactTypeRequest, PutArtifactTypeResponse, artifact_type);
put_single_type_messages!(PutExecutionTypeRequest, PutExecutionTypeResponse, execution_type);
put_single_type_messages!(PutContextTypeRequest, PutContextTypeResponse, context_type);

// ---------------------------------------------------------------------------
// Type reads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTypeByNameRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub transaction_options: TransactionOptions,
}

pub type GetArtifactTypeRequest = GetTypeByNameRequest;
pub type GetExecutionTypeRequest = GetTypeByNameRequest;
pub type GetContextTypeRequest = GetTypeByNameRequest;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactTypeResponse {
    pub artifact_type: TypeDef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionTypeResponse {
    pub execution_type: TypeDef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextTypeResponse {
    pub context_type: TypeDef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetTypesByIdRequest {
    pub type_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

pub type GetArtifactTypesByIdRequest = GetTypesByIdRequest;
pub type GetExecutionTypesByIdRequest = GetTypesByIdRequest;
pub type GetContextTypesByIdRequest = GetTypesByIdRequest;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactTypesByIdResponse {
    pub artifact_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionTypesByIdResponse {
    pub execution_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextTypesByIdResponse {
    pub context_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetAllTypesRequest {
    pub transaction_options: TransactionOptions,
}

pub type GetArtifactTypesRequest = GetAllTypesRequest;
pub type GetExecutionTypesRequest = GetAllTypesRequest;
pub type GetContextTypesRequest = GetAllTypesRequest;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactTypesResponse {
    pub artifact_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionTypesResponse {
    pub execution_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextTypesResponse {
    pub context_types: Vec<TypeDef>,
}

// ---------------------------------------------------------------------------
// Entity writes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutArtifactsOptions {
    /// Optimistic concurrency: reject the update when the stored
    /// `last_update_time_since_epoch` differs from the request's copy.
    pub abort_if_latest_updated_time_changed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutArtifactsRequest {
    pub artifacts: Vec<Artifact>,
    pub options: PutArtifactsOptions,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutArtifactsResponse {
    pub artifact_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutExecutionsRequest {
    pub executions: Vec<Execution>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutExecutionsResponse {
    pub execution_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutContextsRequest {
    pub contexts: Vec<Context>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutContextsResponse {
    pub context_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutEventsRequest {
    pub events: Vec<Event>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutEventsResponse {}

/// One artifact/event pair of a compound execution write. Either side may be
/// absent; when both are present their artifact ids must align.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactAndEvent {
    pub artifact: Option<Artifact>,
    pub event: Option<Event>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutExecutionOptions {
    /// Reuse an existing context with the same type and name instead of
    /// failing the create. Under concurrent first-time creation the loser
    /// observes an abort and is expected to retry.
    pub reuse_context_if_already_exist: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutExecutionRequest {
    pub execution: Option<Execution>,
    pub artifact_event_pairs: Vec<ArtifactAndEvent>,
    pub contexts: Vec<Context>,
    pub options: PutExecutionOptions,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutExecutionResponse {
    pub execution_id: i64,
    pub artifact_ids: Vec<i64>,
    pub context_ids: Vec<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutAttributionsAndAssociationsRequest {
    pub attributions: Vec<Attribution>,
    pub associations: Vec<Association>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutAttributionsAndAssociationsResponse {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutParentContextsRequest {
    pub parent_contexts: Vec<ParentContext>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PutParentContextsResponse {}

// ---------------------------------------------------------------------------
// Entity reads
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsRequest {
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsResponse {
    pub artifacts: Vec<Artifact>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByIdRequest {
    pub artifact_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByIdResponse {
    pub artifacts: Vec<Artifact>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByTypeRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByTypeResponse {
    pub artifacts: Vec<Artifact>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactByTypeAndNameRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub artifact_name: String,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactByTypeAndNameResponse {
    pub artifact: Option<Artifact>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByUriRequest {
    pub uris: Vec<String>,
    /// Retired scalar predecessor of `uris`. Requests still carrying it are
    /// rejected so stale callers fail loudly instead of silently matching
    /// nothing.
    pub uri: Option<String>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByUriResponse {
    pub artifacts: Vec<Artifact>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByContextRequest {
    pub context_id: i64,
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetArtifactsByContextResponse {
    pub artifacts: Vec<Artifact>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsRequest {
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsResponse {
    pub executions: Vec<Execution>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByIdRequest {
    pub execution_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByIdResponse {
    pub executions: Vec<Execution>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByTypeRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByTypeResponse {
    pub executions: Vec<Execution>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionByTypeAndNameRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub execution_name: String,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionByTypeAndNameResponse {
    pub execution: Option<Execution>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByContextRequest {
    pub context_id: i64,
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetExecutionsByContextResponse {
    pub executions: Vec<Execution>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsRequest {
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsResponse {
    pub contexts: Vec<Context>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByIdRequest {
    pub context_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByIdResponse {
    pub contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByTypeRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub options: Option<ListOperationOptions>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByTypeResponse {
    pub contexts: Vec<Context>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextByTypeAndNameRequest {
    pub type_name: String,
    pub type_version: Option<String>,
    pub context_name: String,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextByTypeAndNameResponse {
    pub context: Option<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByArtifactRequest {
    pub artifact_id: i64,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByArtifactResponse {
    pub contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByExecutionRequest {
    pub execution_id: i64,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetContextsByExecutionResponse {
    pub contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParentContextsByContextRequest {
    pub context_id: i64,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParentContextsByContextResponse {
    pub contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetChildrenContextsByContextRequest {
    pub context_id: i64,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetChildrenContextsByContextResponse {
    pub contexts: Vec<Context>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEventsByArtifactIdsRequest {
    pub artifact_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEventsByArtifactIdsResponse {
    pub events: Vec<Event>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEventsByExecutionIdsRequest {
    pub execution_ids: Vec<i64>,
    pub transaction_options: TransactionOptions,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetEventsByExecutionIdsResponse {
    pub events: Vec<Event>,
}

// ---------------------------------------------------------------------------
// Lineage
// ---------------------------------------------------------------------------

/// Where a lineage traversal stops expanding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConstraint {
    pub max_num_hops: Option<i64>,
    /// Backend-interpreted predicate naming artifacts the traversal must not
    /// expand through.
    pub boundary_artifacts: Option<String>,
    /// Same for executions.
    pub boundary_executions: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraphQueryOptions {
    /// Conditions selecting the seed artifacts. Required.
    pub artifacts_options: Option<ListOperationOptions>,
    pub stop_conditions: BoundaryConstraint,
    /// Positive values cap the total number of returned nodes.
    pub max_node_size: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetLineageGraphRequest {
    pub options: LineageGraphQueryOptions,
    pub transaction_options: TransactionOptions,
}

/// The subgraph reachable from the seed artifacts, with every referenced
/// type included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub artifacts: Vec<Artifact>,
    pub executions: Vec<Execution>,
    pub contexts: Vec<Context>,
    pub events: Vec<Event>,
    pub artifact_types: Vec<TypeDef>,
    pub execution_types: Vec<TypeDef>,
    pub context_types: Vec<TypeDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetLineageGraphResponse {
    pub subgraph: LineageGraph,
}
