//! Entity structures recorded by the store.

use serde::{Deserialize, Serialize};

use crate::value::PropertyMap;

/// Lifecycle state of an artifact.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactState {
    Unknown,
    Pending,
    Live,
    MarkedForDeletion,
    Deleted,
    Abandoned,
    Reference,
}

/// Last known state of an execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Unknown,
    New,
    Running,
    Complete,
    Failed,
    Cached,
    Canceled,
}

/// A data object produced or consumed by an execution.
///
/// `name` is unique within the artifact's type. Timestamps are milliseconds
/// since the Unix epoch and are assigned by storage on create/update.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Option<i64>,
    pub type_id: Option<i64>,
    pub uri: Option<String>,
    pub name: Option<String>,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub state: Option<ArtifactState>,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

/// A run of a pipeline step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Option<i64>,
    pub type_id: Option<i64>,
    pub name: Option<String>,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub last_known_state: Option<ExecutionState>,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

/// A grouping (experiment, run, project) of artifacts and executions.
/// Unlike artifacts and executions, the name is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub id: Option<i64>,
    pub type_id: Option<i64>,
    pub name: String,
    pub properties: PropertyMap,
    pub custom_properties: PropertyMap,
    pub create_time_since_epoch: i64,
    pub last_update_time_since_epoch: i64,
}

/// Role of an event on the execution/artifact edge.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Unknown,
    DeclaredOutput,
    DeclaredInput,
    Input,
    Output,
    InternalInput,
    InternalOutput,
}

/// One step of an event path: a list index or a named key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStep {
    Index(i64),
    Key(String),
}

/// Directed link between an execution and an artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub artifact_id: Option<i64>,
    pub execution_id: Option<i64>,
    pub event_type: EventType,
    pub path: Vec<EventStep>,
    pub milliseconds_since_epoch: i64,
}

impl Default for Event {
    fn default() -> Self {
        Event {
            artifact_id: None,
            execution_id: None,
            event_type: EventType::Unknown,
            path: Vec::new(),
            milliseconds_since_epoch: 0,
        }
    }
}

/// Membership link between a context and an execution. Unique per pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub context_id: i64,
    pub execution_id: i64,
}

/// Membership link between a context and an artifact. Unique per pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub context_id: i64,
    pub artifact_id: i64,
}

/// Parent/child link between two contexts. Insert-only, acyclic by contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ParentContext {
    pub child_id: i64,
    pub parent_id: i64,
}
