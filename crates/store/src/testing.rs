//! In-memory doubles of the storage contracts.
//!
//! [`InMemoryMetadataAccessObject`] keeps the whole store in one mutex-guarded
//! state value and [`InMemoryTransactionExecutor`] snapshots that state around
//! each unit of work, so rollback behaves like a real transaction. Intended
//! for unit tests and prototypes; durable deployments use a relational
//! backend.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;

use crate::api::{
    LineageGraph, ListOperationOptions, OrderByField, TransactionOptions,
};
use crate::entities::{Artifact, Association, Attribution, Context, Event, Execution, ParentContext};
use crate::executor::{TransactionExecutor, UnitFuture};
use crate::mao::{ListedPage, MetadataAccessObject};
use crate::schema::{validate_property_map, TypeDef, TypeKind};
use crate::time::now_millis;
use crate::{StoreError, StoreResult};

#[derive(Clone, Debug, Default)]
struct State {
    initialized: bool,
    next_id: i64,
    types: BTreeMap<i64, (TypeKind, TypeDef)>,
    parent_types: BTreeSet<(i16, i64, i64)>,
    artifacts: BTreeMap<i64, Artifact>,
    executions: BTreeMap<i64, Execution>,
    contexts: BTreeMap<i64, Context>,
    events: Vec<Event>,
    associations: BTreeSet<(i64, i64)>,
    attributions: BTreeSet<(i64, i64)>,
    parent_contexts: BTreeSet<(i64, i64)>,
}

impl State {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn type_for(&self, kind: TypeKind, type_id: Option<i64>) -> StoreResult<&TypeDef> {
        let type_id = type_id.ok_or_else(|| {
            StoreError::invalid_argument(format!("{} has no type_id", kind.label()))
        })?;
        match self.types.get(&type_id) {
            Some((stored_kind, type_def)) if *stored_kind == kind => Ok(type_def),
            _ => Err(StoreError::invalid_argument(format!(
                "{} type with id {type_id} does not exist",
                kind.label()
            ))),
        }
    }
}

/// Whole-store access object backed by process memory.
#[derive(Clone, Default)]
pub struct InMemoryMetadataAccessObject {
    state: Arc<Mutex<State>>,
}

impl InMemoryMetadataAccessObject {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> State {
        self.lock().clone()
    }

    fn restore(&self, snapshot: State) {
        *self.lock() = snapshot;
    }
}

/// Runs units of work against an in-memory access object, restoring the
/// pre-transaction state when the unit fails.
#[derive(Clone, Default)]
pub struct InMemoryTransactionExecutor {
    mao: InMemoryMetadataAccessObject,
}

impl InMemoryTransactionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mao(&self) -> &InMemoryMetadataAccessObject {
        &self.mao
    }
}

#[async_trait]
impl TransactionExecutor for InMemoryTransactionExecutor {
    async fn execute<R, F>(&self, options: TransactionOptions, mut work: F) -> StoreResult<R>
    where
        R: Send,
        F: for<'c> FnMut(&'c dyn MetadataAccessObject) -> UnitFuture<'c, R> + Send,
    {
        if let Some(tag) = &options.tag {
            debug!("executing in-memory transaction `{tag}`");
        }
        let snapshot = self.mao.snapshot();
        match work(&self.mao).await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.mao.restore(snapshot);
                Err(err)
            }
        }
    }
}

// -- listing helpers -------------------------------------------------------

trait Listed {
    fn listed_id(&self) -> i64;
    fn create_time(&self) -> i64;
    fn update_time(&self) -> i64;
}

macro_rules! impl_listed {
    ($entity:ident) => {
        impl Listed for $entity {
            fn listed_id(&self) -> i64 {
                self.id.unwrap_or_default()
            }
            fn create_time(&self) -> i64 {
                self.create_time_since_epoch
            }
            fn update_time(&self) -> i64 {
                self.last_update_time_since_epoch
            }
        }
    };
}

impl_listed!(Artifact);
impl_listed!(Execution);
impl_listed!(Context);

fn order_value<T: Listed>(item: &T, field: OrderByField) -> i64 {
    match field {
        OrderByField::Id => item.listed_id(),
        OrderByField::CreateTime => item.create_time(),
        OrderByField::LastUpdateTime => item.update_time(),
    }
}

fn parse_page_token(token: &str) -> StoreResult<(i64, i64)> {
    let (value, id) = token
        .split_once(':')
        .ok_or_else(|| StoreError::invalid_argument(format!("malformed page token `{token}`")))?;
    let value = value
        .parse()
        .map_err(|_| StoreError::invalid_argument(format!("malformed page token `{token}`")))?;
    let id = id
        .parse()
        .map_err(|_| StoreError::invalid_argument(format!("malformed page token `{token}`")))?;
    Ok((value, id))
}

fn list_page<T: Listed>(
    mut items: Vec<T>,
    options: Option<&ListOperationOptions>,
) -> StoreResult<ListedPage<T>> {
    let default_options = ListOperationOptions::default();
    let options = options.unwrap_or(&default_options);
    let (field, is_asc) = options
        .order_by
        .map(|order_by| (order_by.field, order_by.is_asc))
        .unwrap_or((OrderByField::Id, true));
    items.sort_by_key(|item| (order_value(item, field), item.listed_id()));
    if !is_asc {
        items.reverse();
    }
    if let Some(token) = options.next_page_token.as_deref() {
        let last = parse_page_token(token)?;
        items.retain(|item| {
            let key = (order_value(item, field), item.listed_id());
            if is_asc {
                key > last
            } else {
                key < last
            }
        });
    }
    let page_size = options
        .max_result_size
        .filter(|&size| size > 0)
        .map(|size| size as usize)
        .unwrap_or(usize::MAX);
    let mut next_page_token = None;
    if items.len() > page_size {
        items.truncate(page_size);
        let last = &items[page_size - 1];
        next_page_token = Some(format!("{}:{}", order_value(last, field), last.listed_id()));
    }
    Ok(ListedPage {
        items,
        next_page_token,
    })
}

#[async_trait]
impl MetadataAccessObject for InMemoryMetadataAccessObject {
    async fn create_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<i64> {
        let mut state = self.lock();
        if type_def.name.is_empty() {
            return Err(StoreError::invalid_argument("type name must be set"));
        }
        let version = type_def
            .version
            .clone()
            .filter(|version| !version.is_empty());
        let exists = state.types.values().any(|(stored_kind, stored)| {
            *stored_kind == kind && stored.name == type_def.name && stored.version == version
        });
        if exists {
            return Err(StoreError::already_exists(format!(
                "{} type `{}` already exists",
                kind.label(),
                type_def.name
            )));
        }
        let type_id = state.assign_id();
        let mut stored = type_def.clone();
        stored.id = Some(type_id);
        stored.version = version;
        stored.base_type = None;
        state.types.insert(type_id, (kind, stored));
        Ok(type_id)
    }

    async fn update_type(&self, kind: TypeKind, type_def: &TypeDef) -> StoreResult<()> {
        let mut state = self.lock();
        let type_id = type_def
            .id
            .ok_or_else(|| StoreError::invalid_argument("type id must be set for update"))?;
        match state.types.get_mut(&type_id) {
            Some((stored_kind, stored)) if *stored_kind == kind => {
                stored.properties = type_def.properties.clone();
                stored.description = type_def.description.clone();
                Ok(())
            }
            _ => Err(StoreError::not_found(format!(
                "no {} type with id {type_id}",
                kind.label()
            ))),
        }
    }

    async fn find_type_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<TypeDef> {
        let state = self.lock();
        state
            .types
            .values()
            .find(|(stored_kind, stored)| {
                *stored_kind == kind && stored.name == name && stored.version.as_deref() == version
            })
            .map(|(_, stored)| stored.clone())
            .ok_or_else(|| {
                StoreError::not_found(format!("no {} type named `{name}`", kind.label()))
            })
    }

    async fn find_type_id_by_name_and_version(
        &self,
        kind: TypeKind,
        name: &str,
        version: Option<&str>,
    ) -> StoreResult<i64> {
        let type_def = self.find_type_by_name_and_version(kind, name, version).await?;
        type_def
            .id
            .ok_or_else(|| StoreError::internal("stored type has no id"))
    }

    async fn find_types_by_ids(
        &self,
        kind: TypeKind,
        type_ids: &[i64],
    ) -> StoreResult<Vec<TypeDef>> {
        let state = self.lock();
        Ok(type_ids
            .iter()
            .filter_map(|type_id| match state.types.get(type_id) {
                Some((stored_kind, stored)) if *stored_kind == kind => Some(stored.clone()),
                _ => None,
            })
            .collect())
    }

    async fn find_types(&self, kind: TypeKind) -> StoreResult<Vec<TypeDef>> {
        let state = self.lock();
        Ok(state
            .types
            .values()
            .filter(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, stored)| stored.clone())
            .collect())
    }

    async fn create_parent_type_link(
        &self,
        kind: TypeKind,
        child: &TypeDef,
        parent: &TypeDef,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        let child_id = child
            .id
            .ok_or_else(|| StoreError::invalid_argument("child type id must be set"))?;
        let parent_id = parent
            .id
            .ok_or_else(|| StoreError::invalid_argument("parent type id must be set"))?;
        if !state.parent_types.insert((kind.as_i16(), child_id, parent_id)) {
            return Err(StoreError::already_exists(format!(
                "type {child_id} already inherits from {parent_id}"
            )));
        }
        Ok(())
    }

    async fn find_parent_types_by_type_ids(
        &self,
        kind: TypeKind,
        type_ids: &[i64],
    ) -> StoreResult<HashMap<i64, Vec<TypeDef>>> {
        let state = self.lock();
        let wanted: HashSet<i64> = type_ids.iter().copied().collect();
        let mut parents: HashMap<i64, Vec<TypeDef>> = HashMap::new();
        for (link_kind, child_id, parent_id) in &state.parent_types {
            if *link_kind != kind.as_i16() || !wanted.contains(child_id) {
                continue;
            }
            if let Some((_, parent)) = state.types.get(parent_id) {
                parents.entry(*child_id).or_default().push(parent.clone());
            }
        }
        Ok(parents)
    }

    async fn create_artifact(&self, artifact: &Artifact) -> StoreResult<i64> {
        let mut state = self.lock();
        let type_def = state.type_for(TypeKind::Artifact, artifact.type_id)?;
        validate_property_map(type_def, &artifact.properties)?;
        if let Some(name) = &artifact.name {
            let taken = state.artifacts.values().any(|stored| {
                stored.type_id == artifact.type_id && stored.name.as_deref() == Some(name)
            });
            if taken {
                return Err(StoreError::already_exists(format!(
                    "artifact named `{name}` already exists for the type"
                )));
            }
        }
        let id = state.assign_id();
        let now = now_millis();
        let mut stored = artifact.clone();
        stored.id = Some(id);
        stored.create_time_since_epoch = now;
        stored.last_update_time_since_epoch = now;
        state.artifacts.insert(id, stored);
        Ok(id)
    }

    async fn update_artifact(&self, artifact: &Artifact) -> StoreResult<()> {
        let mut state = self.lock();
        let id = artifact
            .id
            .ok_or_else(|| StoreError::invalid_argument("artifact id must be set for update"))?;
        let stored_type_id = state
            .artifacts
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("no artifact with id {id}")))?
            .type_id;
        if artifact.type_id.is_some() && artifact.type_id != stored_type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored artifact cannot change",
            ));
        }
        let type_def = state.type_for(TypeKind::Artifact, stored_type_id)?;
        validate_property_map(type_def, &artifact.properties)?;
        let now = now_millis();
        let stored = state
            .artifacts
            .get_mut(&id)
            .ok_or_else(|| StoreError::internal(format!("artifact {id} vanished mid-update")))?;
        let create_time = stored.create_time_since_epoch;
        *stored = artifact.clone();
        stored.type_id = stored_type_id;
        stored.create_time_since_epoch = create_time;
        stored.last_update_time_since_epoch = now;
        Ok(())
    }

    async fn find_artifacts_by_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Artifact>> {
        let state = self.lock();
        artifact_ids
            .iter()
            .map(|id| {
                state
                    .artifacts
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no artifact with id {id}")))
            })
            .collect()
    }

    async fn find_artifacts(&self) -> StoreResult<Vec<Artifact>> {
        Ok(self.lock().artifacts.values().cloned().collect())
    }

    async fn list_artifacts(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Artifact>> {
        list_page(self.lock().artifacts.values().cloned().collect(), Some(options))
    }

    async fn find_artifacts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>> {
        let items: Vec<Artifact> = self
            .lock()
            .artifacts
            .values()
            .filter(|artifact| artifact.type_id == Some(type_id))
            .cloned()
            .collect();
        list_page(items, options)
    }

    async fn find_artifact_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Artifact> {
        self.lock()
            .artifacts
            .values()
            .find(|artifact| {
                artifact.type_id == Some(type_id) && artifact.name.as_deref() == Some(name)
            })
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(format!("no artifact named `{name}` for type {type_id}"))
            })
    }

    async fn find_artifacts_by_uri(&self, uri: &str) -> StoreResult<Vec<Artifact>> {
        Ok(self
            .lock()
            .artifacts
            .values()
            .filter(|artifact| artifact.uri.as_deref() == Some(uri))
            .cloned()
            .collect())
    }

    async fn create_execution(&self, execution: &Execution) -> StoreResult<i64> {
        let mut state = self.lock();
        let type_def = state.type_for(TypeKind::Execution, execution.type_id)?;
        validate_property_map(type_def, &execution.properties)?;
        if let Some(name) = &execution.name {
            let taken = state.executions.values().any(|stored| {
                stored.type_id == execution.type_id && stored.name.as_deref() == Some(name)
            });
            if taken {
                return Err(StoreError::already_exists(format!(
                    "execution named `{name}` already exists for the type"
                )));
            }
        }
        let id = state.assign_id();
        let now = now_millis();
        let mut stored = execution.clone();
        stored.id = Some(id);
        stored.create_time_since_epoch = now;
        stored.last_update_time_since_epoch = now;
        state.executions.insert(id, stored);
        Ok(id)
    }

    async fn update_execution(&self, execution: &Execution) -> StoreResult<()> {
        let mut state = self.lock();
        let id = execution
            .id
            .ok_or_else(|| StoreError::invalid_argument("execution id must be set for update"))?;
        let stored_type_id = state
            .executions
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("no execution with id {id}")))?
            .type_id;
        if execution.type_id.is_some() && execution.type_id != stored_type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored execution cannot change",
            ));
        }
        let type_def = state.type_for(TypeKind::Execution, stored_type_id)?;
        validate_property_map(type_def, &execution.properties)?;
        let now = now_millis();
        let stored = state
            .executions
            .get_mut(&id)
            .ok_or_else(|| StoreError::internal(format!("execution {id} vanished mid-update")))?;
        let create_time = stored.create_time_since_epoch;
        *stored = execution.clone();
        stored.type_id = stored_type_id;
        stored.create_time_since_epoch = create_time;
        stored.last_update_time_since_epoch = now;
        Ok(())
    }

    async fn find_executions_by_ids(&self, execution_ids: &[i64]) -> StoreResult<Vec<Execution>> {
        let state = self.lock();
        execution_ids
            .iter()
            .map(|id| {
                state
                    .executions
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no execution with id {id}")))
            })
            .collect()
    }

    async fn find_executions(&self) -> StoreResult<Vec<Execution>> {
        Ok(self.lock().executions.values().cloned().collect())
    }

    async fn list_executions(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Execution>> {
        list_page(self.lock().executions.values().cloned().collect(), Some(options))
    }

    async fn find_executions_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>> {
        let items: Vec<Execution> = self
            .lock()
            .executions
            .values()
            .filter(|execution| execution.type_id == Some(type_id))
            .cloned()
            .collect();
        list_page(items, options)
    }

    async fn find_execution_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Execution> {
        self.lock()
            .executions
            .values()
            .find(|execution| {
                execution.type_id == Some(type_id) && execution.name.as_deref() == Some(name)
            })
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(format!("no execution named `{name}` for type {type_id}"))
            })
    }

    async fn create_context(&self, context: &Context) -> StoreResult<i64> {
        let mut state = self.lock();
        if context.name.is_empty() {
            return Err(StoreError::invalid_argument("context name must be set"));
        }
        let type_def = state.type_for(TypeKind::Context, context.type_id)?;
        validate_property_map(type_def, &context.properties)?;
        let taken = state
            .contexts
            .values()
            .any(|stored| stored.type_id == context.type_id && stored.name == context.name);
        if taken {
            return Err(StoreError::already_exists(format!(
                "context named `{}` already exists for the type",
                context.name
            )));
        }
        let id = state.assign_id();
        let now = now_millis();
        let mut stored = context.clone();
        stored.id = Some(id);
        stored.create_time_since_epoch = now;
        stored.last_update_time_since_epoch = now;
        state.contexts.insert(id, stored);
        Ok(id)
    }

    async fn update_context(&self, context: &Context) -> StoreResult<()> {
        let mut state = self.lock();
        let id = context
            .id
            .ok_or_else(|| StoreError::invalid_argument("context id must be set for update"))?;
        let stored_type_id = state
            .contexts
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("no context with id {id}")))?
            .type_id;
        if context.type_id.is_some() && context.type_id != stored_type_id {
            return Err(StoreError::invalid_argument(
                "the type_id of a stored context cannot change",
            ));
        }
        let type_def = state.type_for(TypeKind::Context, stored_type_id)?;
        validate_property_map(type_def, &context.properties)?;
        let duplicate = state.contexts.values().any(|stored| {
            stored.id != Some(id)
                && stored.type_id == stored_type_id
                && stored.name == context.name
        });
        if duplicate {
            return Err(StoreError::already_exists(format!(
                "context named `{}` already exists for the type",
                context.name
            )));
        }
        let now = now_millis();
        let stored = state
            .contexts
            .get_mut(&id)
            .ok_or_else(|| StoreError::internal(format!("context {id} vanished mid-update")))?;
        let create_time = stored.create_time_since_epoch;
        *stored = context.clone();
        stored.type_id = stored_type_id;
        stored.create_time_since_epoch = create_time;
        stored.last_update_time_since_epoch = now;
        Ok(())
    }

    async fn find_contexts_by_ids(&self, context_ids: &[i64]) -> StoreResult<Vec<Context>> {
        let state = self.lock();
        context_ids
            .iter()
            .map(|id| {
                state
                    .contexts
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(format!("no context with id {id}")))
            })
            .collect()
    }

    async fn find_contexts(&self) -> StoreResult<Vec<Context>> {
        Ok(self.lock().contexts.values().cloned().collect())
    }

    async fn list_contexts(
        &self,
        options: &ListOperationOptions,
    ) -> StoreResult<ListedPage<Context>> {
        list_page(self.lock().contexts.values().cloned().collect(), Some(options))
    }

    async fn find_contexts_by_type_id(
        &self,
        type_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Context>> {
        let items: Vec<Context> = self
            .lock()
            .contexts
            .values()
            .filter(|context| context.type_id == Some(type_id))
            .cloned()
            .collect();
        list_page(items, options)
    }

    async fn find_context_by_type_id_and_name(
        &self,
        type_id: i64,
        name: &str,
    ) -> StoreResult<Context> {
        self.lock()
            .contexts
            .values()
            .find(|context| context.type_id == Some(type_id) && context.name == name)
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(format!("no context named `{name}` for type {type_id}"))
            })
    }

    async fn create_event(&self, event: &Event) -> StoreResult<i64> {
        let mut state = self.lock();
        let artifact_id = event
            .artifact_id
            .ok_or_else(|| StoreError::invalid_argument("event artifact_id must be set"))?;
        let execution_id = event
            .execution_id
            .ok_or_else(|| StoreError::invalid_argument("event execution_id must be set"))?;
        if !state.artifacts.contains_key(&artifact_id) {
            return Err(StoreError::invalid_argument(format!(
                "event references unknown artifact {artifact_id}"
            )));
        }
        if !state.executions.contains_key(&execution_id) {
            return Err(StoreError::invalid_argument(format!(
                "event references unknown execution {execution_id}"
            )));
        }
        state.events.push(event.clone());
        Ok(state.assign_id())
    }

    async fn find_events_by_artifact_ids(&self, artifact_ids: &[i64]) -> StoreResult<Vec<Event>> {
        let wanted: HashSet<i64> = artifact_ids.iter().copied().collect();
        Ok(self
            .lock()
            .events
            .iter()
            .filter(|event| event.artifact_id.is_some_and(|id| wanted.contains(&id)))
            .cloned()
            .collect())
    }

    async fn find_events_by_execution_ids(
        &self,
        execution_ids: &[i64],
    ) -> StoreResult<Vec<Event>> {
        let wanted: HashSet<i64> = execution_ids.iter().copied().collect();
        Ok(self
            .lock()
            .events
            .iter()
            .filter(|event| event.execution_id.is_some_and(|id| wanted.contains(&id)))
            .cloned()
            .collect())
    }

    async fn create_association(&self, association: &Association) -> StoreResult<i64> {
        let mut state = self.lock();
        if !state.contexts.contains_key(&association.context_id) {
            return Err(StoreError::invalid_argument(format!(
                "association references unknown context {}",
                association.context_id
            )));
        }
        if !state.executions.contains_key(&association.execution_id) {
            return Err(StoreError::invalid_argument(format!(
                "association references unknown execution {}",
                association.execution_id
            )));
        }
        if !state
            .associations
            .insert((association.context_id, association.execution_id))
        {
            return Err(StoreError::already_exists(format!(
                "association ({}, {}) already exists",
                association.context_id, association.execution_id
            )));
        }
        Ok(state.assign_id())
    }

    async fn create_attribution(&self, attribution: &Attribution) -> StoreResult<i64> {
        let mut state = self.lock();
        if !state.contexts.contains_key(&attribution.context_id) {
            return Err(StoreError::invalid_argument(format!(
                "attribution references unknown context {}",
                attribution.context_id
            )));
        }
        if !state.artifacts.contains_key(&attribution.artifact_id) {
            return Err(StoreError::invalid_argument(format!(
                "attribution references unknown artifact {}",
                attribution.artifact_id
            )));
        }
        if !state
            .attributions
            .insert((attribution.context_id, attribution.artifact_id))
        {
            return Err(StoreError::already_exists(format!(
                "attribution ({}, {}) already exists",
                attribution.context_id, attribution.artifact_id
            )));
        }
        Ok(state.assign_id())
    }

    async fn find_contexts_by_artifact(&self, artifact_id: i64) -> StoreResult<Vec<Context>> {
        let state = self.lock();
        Ok(state
            .attributions
            .iter()
            .filter(|(_, linked)| *linked == artifact_id)
            .filter_map(|(context_id, _)| state.contexts.get(context_id).cloned())
            .collect())
    }

    async fn find_contexts_by_execution(&self, execution_id: i64) -> StoreResult<Vec<Context>> {
        let state = self.lock();
        Ok(state
            .associations
            .iter()
            .filter(|(_, linked)| *linked == execution_id)
            .filter_map(|(context_id, _)| state.contexts.get(context_id).cloned())
            .collect())
    }

    async fn find_artifacts_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Artifact>> {
        let state = self.lock();
        let items: Vec<Artifact> = state
            .attributions
            .iter()
            .filter(|(linked, _)| *linked == context_id)
            .filter_map(|(_, artifact_id)| state.artifacts.get(artifact_id).cloned())
            .collect();
        list_page(items, options)
    }

    async fn find_executions_by_context(
        &self,
        context_id: i64,
        options: Option<&ListOperationOptions>,
    ) -> StoreResult<ListedPage<Execution>> {
        let state = self.lock();
        let items: Vec<Execution> = state
            .associations
            .iter()
            .filter(|(linked, _)| *linked == context_id)
            .filter_map(|(_, execution_id)| state.executions.get(execution_id).cloned())
            .collect();
        list_page(items, options)
    }

    async fn create_parent_context(&self, parent_context: &ParentContext) -> StoreResult<()> {
        let mut state = self.lock();
        if parent_context.child_id == parent_context.parent_id {
            return Err(StoreError::invalid_argument(
                "a context cannot be its own parent",
            ));
        }
        for context_id in [parent_context.child_id, parent_context.parent_id] {
            if !state.contexts.contains_key(&context_id) {
                return Err(StoreError::invalid_argument(format!(
                    "parent context link references unknown context {context_id}"
                )));
            }
        }
        if !state
            .parent_contexts
            .insert((parent_context.child_id, parent_context.parent_id))
        {
            return Err(StoreError::already_exists(format!(
                "context {} already has parent {}",
                parent_context.child_id, parent_context.parent_id
            )));
        }
        Ok(())
    }

    async fn find_parent_contexts_by_context_id(
        &self,
        context_id: i64,
    ) -> StoreResult<Vec<Context>> {
        let state = self.lock();
        Ok(state
            .parent_contexts
            .iter()
            .filter(|(child_id, _)| *child_id == context_id)
            .filter_map(|(_, parent_id)| state.contexts.get(parent_id).cloned())
            .collect())
    }

    async fn find_child_contexts_by_context_id(
        &self,
        context_id: i64,
    ) -> StoreResult<Vec<Context>> {
        let state = self.lock();
        Ok(state
            .parent_contexts
            .iter()
            .filter(|(_, parent_id)| *parent_id == context_id)
            .filter_map(|(child_id, _)| state.contexts.get(child_id).cloned())
            .collect())
    }

    async fn query_lineage_graph(
        &self,
        seed_artifacts: &[Artifact],
        max_num_hops: i64,
        max_node_size: Option<i64>,
        boundary_artifacts: Option<&str>,
        boundary_executions: Option<&str>,
    ) -> StoreResult<LineageGraph> {
        if boundary_artifacts.is_some() || boundary_executions.is_some() {
            return Err(StoreError::unimplemented(
                "boundary conditions are not supported by the in-memory backend",
            ));
        }
        let state = self.lock();
        let node_budget = max_node_size.map(|size| size as usize).unwrap_or(usize::MAX);
        let mut artifacts: BTreeSet<i64> = BTreeSet::new();
        for artifact in seed_artifacts {
            if artifacts.len() >= node_budget {
                break;
            }
            artifacts.extend(artifact.id);
        }
        let mut executions: BTreeSet<i64> = BTreeSet::new();
        let mut frontier_is_artifacts = true;
        let mut frontier: Vec<i64> = artifacts.iter().copied().collect();
        for _ in 0..max_num_hops {
            if frontier.is_empty() || artifacts.len() + executions.len() >= node_budget {
                break;
            }
            let mut discovered = BTreeSet::new();
            for event in &state.events {
                let (Some(artifact_id), Some(execution_id)) =
                    (event.artifact_id, event.execution_id)
                else {
                    continue;
                };
                if frontier_is_artifacts
                    && frontier.contains(&artifact_id)
                    && !executions.contains(&execution_id)
                {
                    discovered.insert(execution_id);
                } else if !frontier_is_artifacts
                    && frontier.contains(&execution_id)
                    && !artifacts.contains(&artifact_id)
                {
                    discovered.insert(artifact_id);
                }
            }
            // The near side of the frontier is fixed for this hop; only the
            // far side grows, so its length alone tracks the node budget.
            let near_side_len = if frontier_is_artifacts {
                artifacts.len()
            } else {
                executions.len()
            };
            let visited = if frontier_is_artifacts {
                &mut executions
            } else {
                &mut artifacts
            };
            let mut admitted = Vec::new();
            for node in discovered {
                if near_side_len + visited.len() >= node_budget {
                    break;
                }
                visited.insert(node);
                admitted.push(node);
            }
            frontier = admitted;
            frontier_is_artifacts = !frontier_is_artifacts;
        }
        let events: Vec<Event> = state
            .events
            .iter()
            .filter(|event| {
                event.artifact_id.is_some_and(|id| artifacts.contains(&id))
                    && event.execution_id.is_some_and(|id| executions.contains(&id))
            })
            .cloned()
            .collect();
        let graph_artifacts: Vec<Artifact> = artifacts
            .iter()
            .filter_map(|id| state.artifacts.get(id).cloned())
            .collect();
        let graph_executions: Vec<Execution> = executions
            .iter()
            .filter_map(|id| state.executions.get(id).cloned())
            .collect();
        let artifact_type_ids: BTreeSet<i64> = graph_artifacts
            .iter()
            .filter_map(|artifact| artifact.type_id)
            .collect();
        let execution_type_ids: BTreeSet<i64> = graph_executions
            .iter()
            .filter_map(|execution| execution.type_id)
            .collect();
        let types_of = |wanted: &BTreeSet<i64>, kind: TypeKind| -> Vec<TypeDef> {
            state
                .types
                .iter()
                .filter(|(type_id, (stored_kind, _))| {
                    *stored_kind == kind && wanted.contains(type_id)
                })
                .map(|(_, (_, stored))| stored.clone())
                .collect()
        };
        Ok(LineageGraph {
            artifact_types: types_of(&artifact_type_ids, TypeKind::Artifact),
            execution_types: types_of(&execution_type_ids, TypeKind::Execution),
            context_types: Vec::new(),
            artifacts: graph_artifacts,
            executions: graph_executions,
            contexts: Vec::new(),
            events,
        })
    }

    async fn init_metadata_source(&self) -> StoreResult<()> {
        let mut state = self.lock();
        *state = State {
            initialized: true,
            ..State::default()
        };
        Ok(())
    }

    async fn init_metadata_source_if_not_exists(
        &self,
        _enable_upgrade_migration: bool,
    ) -> StoreResult<()> {
        let mut state = self.lock();
        if !state.initialized {
            *state = State {
                initialized: true,
                ..State::default()
            };
        }
        Ok(())
    }

    async fn downgrade_schema(&self, version: i64) -> StoreResult<()> {
        if version != 0 {
            return Err(StoreError::invalid_argument(format!(
                "the in-memory backend only supports downgrading to version 0, got {version}"
            )));
        }
        *self.lock() = State::default();
        Ok(())
    }
}
