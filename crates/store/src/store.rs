//! The public facade: one method per store operation.
//!
//! Every method hands a unit of work to the transaction executor. The unit
//! builds its response from scratch on each invocation, so executor-level
//! retries never observe half-filled output. The store itself keeps no state
//! between requests.

use std::collections::HashSet;
use std::time::Duration;

use log::{info, warn};

use crate::api::*;
use crate::entities::Artifact;
use crate::executor::TransactionExecutor;
use crate::graph;
use crate::mao::ListedPage;
use crate::schema::TypeKind;
use crate::simple_types::{is_simple_type_name, simple_artifact_types, simple_execution_types};
use crate::type_engine::{request_type_version, set_base_types, upsert_type, upsert_type_batch};
use crate::upsert::{
    insert_association_if_not_exist, insert_attribution_if_not_exist, upsert_artifact,
    upsert_context, upsert_execution,
};
use crate::{StoreError, StoreResult};

/// Hop ceiling for lineage traversals, independent of what the request asks
/// for.
const MAX_LINEAGE_DISTANCE: i64 = 20;

/// Lists, by-type, by-name, and by-uri lookups read an absent match as an
/// empty result rather than an error.
fn empty_if_not_found<T: Default>(result: StoreResult<T>) -> StoreResult<T> {
    match result {
        Err(err) if err.is_not_found() => Ok(T::default()),
        other => other,
    }
}

/// The metadata store. Owns its transaction executor, which in turn owns the
/// data-access path down to the physical source; teardown releases them in
/// reverse.
#[derive(Debug)]
pub struct MetadataStore<E> {
    executor: E,
}

impl<E: TransactionExecutor> MetadataStore<E> {
    /// Wraps an executor without touching the schema. Use [`Self::create`]
    /// when migration options should be honored.
    pub fn new(executor: E) -> Self {
        MetadataStore { executor }
    }

    /// Builds a store, honoring the migration options.
    ///
    /// A requested downgrade is executed inside a transaction and then
    /// surfaced as `Cancelled`: the downgraded schema must be reopened with a
    /// library version that matches it, so no store is returned.
    pub async fn create(executor: E, migration_options: &MigrationOptions) -> StoreResult<Self> {
        if let Some(version) = migration_options.downgrade_to_schema_version {
            if version < 0 {
                return Err(StoreError::invalid_argument(format!(
                    "downgrade_to_schema_version cannot be negative: {version}"
                )));
            }
            executor
                .execute(TransactionOptions::default(), move |mao| {
                    Box::pin(async move { mao.downgrade_schema(version).await })
                })
                .await?;
            return Err(StoreError::cancelled(format!(
                "downgrade migration was performed and the connection is cancelled; the database \
                 is now at schema version {version}, reconnect with a library version that \
                 supports it"
            )));
        }
        Ok(Self::new(executor))
    }

    /// Initialises the schema from scratch and seeds the simple types.
    pub async fn init_metadata_store(&self) -> StoreResult<()> {
        self.executor
            .execute(TransactionOptions::default(), |mao| {
                Box::pin(async move { mao.init_metadata_source().await })
            })
            .await?;
        self.seed_simple_types().await
    }

    /// Initialises the schema only when absent, then seeds the simple types.
    /// Seeding is tolerant of concurrent first-time inits: the unique type
    /// constraints make the duplicate insert lose, and the upsert reads it
    /// back as compatible.
    pub async fn init_metadata_store_if_not_exists(
        &self,
        enable_upgrade_migration: bool,
    ) -> StoreResult<()> {
        self.executor
            .execute(TransactionOptions::default(), move |mao| {
                Box::pin(async move {
                    mao.init_metadata_source_if_not_exists(enable_upgrade_migration)
                        .await
                })
            })
            .await?;
        self.seed_simple_types().await
    }

    async fn seed_simple_types(&self) -> StoreResult<()> {
        self.executor
            .execute(TransactionOptions::default(), |mao| {
                Box::pin(async move {
                    upsert_type_batch(
                        mao,
                        &simple_artifact_types(),
                        &simple_execution_types(),
                        &[],
                        true,
                        true,
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
    }

    // -- type writes ------------------------------------------------------

    pub async fn put_types(&self, request: PutTypesRequest) -> StoreResult<PutTypesResponse> {
        if !request.all_fields_match {
            return Err(StoreError::unimplemented("must match all fields"));
        }
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let (artifact_type_ids, execution_type_ids, context_type_ids) =
                        upsert_type_batch(
                            mao,
                            &request.artifact_types,
                            &request.execution_types,
                            &request.context_types,
                            request.can_add_fields,
                            request.can_omit_fields,
                        )
                        .await?;
                    Ok(PutTypesResponse {
                        artifact_type_ids,
                        execution_type_ids,
                        context_type_ids,
                    })
                })
            })
            .await
    }

    pub async fn put_artifact_type(
        &self,
        request: PutArtifactTypeRequest,
    ) -> StoreResult<PutArtifactTypeResponse> {
        if !request.all_fields_match {
            return Err(StoreError::unimplemented("must match all fields"));
        }
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = upsert_type(
                        mao,
                        TypeKind::Artifact,
                        &request.artifact_type,
                        request.can_add_fields,
                        request.can_omit_fields,
                    )
                    .await?;
                    Ok(PutArtifactTypeResponse { type_id })
                })
            })
            .await
    }

    pub async fn put_execution_type(
        &self,
        request: PutExecutionTypeRequest,
    ) -> StoreResult<PutExecutionTypeResponse> {
        if !request.all_fields_match {
            return Err(StoreError::unimplemented("must match all fields"));
        }
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = upsert_type(
                        mao,
                        TypeKind::Execution,
                        &request.execution_type,
                        request.can_add_fields,
                        request.can_omit_fields,
                    )
                    .await?;
                    Ok(PutExecutionTypeResponse { type_id })
                })
            })
            .await
    }

    pub async fn put_context_type(
        &self,
        request: PutContextTypeRequest,
    ) -> StoreResult<PutContextTypeResponse> {
        if !request.all_fields_match {
            return Err(StoreError::unimplemented("must match all fields"));
        }
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = upsert_type(
                        mao,
                        TypeKind::Context,
                        &request.context_type,
                        request.can_add_fields,
                        request.can_omit_fields,
                    )
                    .await?;
                    Ok(PutContextTypeResponse { type_id })
                })
            })
            .await
    }

    // -- type reads -------------------------------------------------------

    pub async fn get_artifact_type(
        &self,
        request: GetArtifactTypeRequest,
    ) -> StoreResult<GetArtifactTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut artifact_type = mao
                        .find_type_by_name_and_version(
                            TypeKind::Artifact,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await?;
                    set_base_types(
                        mao,
                        TypeKind::Artifact,
                        std::slice::from_mut(&mut artifact_type),
                    )
                    .await?;
                    Ok(GetArtifactTypeResponse { artifact_type })
                })
            })
            .await
    }

    pub async fn get_execution_type(
        &self,
        request: GetExecutionTypeRequest,
    ) -> StoreResult<GetExecutionTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut execution_type = mao
                        .find_type_by_name_and_version(
                            TypeKind::Execution,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await?;
                    set_base_types(
                        mao,
                        TypeKind::Execution,
                        std::slice::from_mut(&mut execution_type),
                    )
                    .await?;
                    Ok(GetExecutionTypeResponse { execution_type })
                })
            })
            .await
    }

    pub async fn get_context_type(
        &self,
        request: GetContextTypeRequest,
    ) -> StoreResult<GetContextTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let context_type = mao
                        .find_type_by_name_and_version(
                            TypeKind::Context,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await?;
                    Ok(GetContextTypeResponse { context_type })
                })
            })
            .await
    }

    pub async fn get_artifact_types_by_id(
        &self,
        request: GetArtifactTypesByIdRequest,
    ) -> StoreResult<GetArtifactTypesByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut artifact_types = mao
                        .find_types_by_ids(TypeKind::Artifact, &request.type_ids)
                        .await?;
                    set_base_types(mao, TypeKind::Artifact, &mut artifact_types).await?;
                    Ok(GetArtifactTypesByIdResponse { artifact_types })
                })
            })
            .await
    }

    pub async fn get_execution_types_by_id(
        &self,
        request: GetExecutionTypesByIdRequest,
    ) -> StoreResult<GetExecutionTypesByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut execution_types = mao
                        .find_types_by_ids(TypeKind::Execution, &request.type_ids)
                        .await?;
                    set_base_types(mao, TypeKind::Execution, &mut execution_types).await?;
                    Ok(GetExecutionTypesByIdResponse { execution_types })
                })
            })
            .await
    }

    pub async fn get_context_types_by_id(
        &self,
        request: GetContextTypesByIdRequest,
    ) -> StoreResult<GetContextTypesByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let context_types = mao
                        .find_types_by_ids(TypeKind::Context, &request.type_ids)
                        .await?;
                    Ok(GetContextTypesByIdResponse { context_types })
                })
            })
            .await
    }

    pub async fn get_artifact_types(
        &self,
        request: GetArtifactTypesRequest,
    ) -> StoreResult<GetArtifactTypesResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                Box::pin(async move {
                    let types = empty_if_not_found(mao.find_types(TypeKind::Artifact).await)?;
                    // Simple types are invisible to the bulk listing.
                    let mut artifact_types: Vec<_> = types
                        .into_iter()
                        .filter(|type_def| !is_simple_type_name(&type_def.name))
                        .collect();
                    set_base_types(mao, TypeKind::Artifact, &mut artifact_types).await?;
                    Ok(GetArtifactTypesResponse { artifact_types })
                })
            })
            .await
    }

    pub async fn get_execution_types(
        &self,
        request: GetExecutionTypesRequest,
    ) -> StoreResult<GetExecutionTypesResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                Box::pin(async move {
                    let types = empty_if_not_found(mao.find_types(TypeKind::Execution).await)?;
                    let mut execution_types: Vec<_> = types
                        .into_iter()
                        .filter(|type_def| !is_simple_type_name(&type_def.name))
                        .collect();
                    set_base_types(mao, TypeKind::Execution, &mut execution_types).await?;
                    Ok(GetExecutionTypesResponse { execution_types })
                })
            })
            .await
    }

    pub async fn get_context_types(
        &self,
        request: GetContextTypesRequest,
    ) -> StoreResult<GetContextTypesResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                Box::pin(async move {
                    let context_types =
                        empty_if_not_found(mao.find_types(TypeKind::Context).await)?;
                    Ok(GetContextTypesResponse { context_types })
                })
            })
            .await
    }

    // -- entity writes ----------------------------------------------------

    pub async fn put_artifacts(
        &self,
        request: PutArtifactsRequest,
    ) -> StoreResult<PutArtifactsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut response = PutArtifactsResponse::default();
                    for artifact in &request.artifacts {
                        if let Some(artifact_id) = artifact.id {
                            if request.options.abort_if_latest_updated_time_changed {
                                match mao
                                    .find_artifacts_by_ids(&[artifact_id])
                                    .await
                                    .map(|mut stored| stored.pop())
                                {
                                    Ok(Some(stored)) => {
                                        if stored.last_update_time_since_epoch
                                            != artifact.last_update_time_since_epoch
                                        {
                                            return Err(StoreError::failed_precondition(format!(
                                                "abort_if_latest_updated_time_changed is set and \
                                                 the stored artifact with id = {artifact_id} has \
                                                 a different last_update_time_since_epoch: {} \
                                                 from the one in the given artifact: {}",
                                                stored.last_update_time_since_epoch,
                                                artifact.last_update_time_since_epoch
                                            )));
                                        }
                                        // The clock is millisecond-granular; wait
                                        // one tick so the updated timestamp is
                                        // strictly greater than the checked one.
                                        tokio::time::sleep(Duration::from_millis(1)).await;
                                    }
                                    Ok(None) => {}
                                    Err(err) if err.is_not_found() => {}
                                    Err(err) => return Err(err),
                                }
                            }
                        }
                        response
                            .artifact_ids
                            .push(upsert_artifact(mao, artifact).await?);
                    }
                    Ok(response)
                })
            })
            .await
    }

    pub async fn put_executions(
        &self,
        request: PutExecutionsRequest,
    ) -> StoreResult<PutExecutionsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut response = PutExecutionsResponse::default();
                    for execution in &request.executions {
                        response
                            .execution_ids
                            .push(upsert_execution(mao, execution).await?);
                    }
                    Ok(response)
                })
            })
            .await
    }

    pub async fn put_contexts(
        &self,
        request: PutContextsRequest,
    ) -> StoreResult<PutContextsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut response = PutContextsResponse::default();
                    for context in &request.contexts {
                        response
                            .context_ids
                            .push(upsert_context(mao, context).await?);
                    }
                    Ok(response)
                })
            })
            .await
    }

    pub async fn put_events(&self, request: PutEventsRequest) -> StoreResult<PutEventsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    for event in &request.events {
                        mao.create_event(event).await?;
                    }
                    Ok(PutEventsResponse {})
                })
            })
            .await
    }

    pub async fn put_execution(
        &self,
        request: PutExecutionRequest,
    ) -> StoreResult<PutExecutionResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move { graph::put_execution(mao, &request).await })
            })
            .await
    }

    pub async fn put_attributions_and_associations(
        &self,
        request: PutAttributionsAndAssociationsRequest,
    ) -> StoreResult<PutAttributionsAndAssociationsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    for attribution in &request.attributions {
                        insert_attribution_if_not_exist(
                            mao,
                            attribution.context_id,
                            attribution.artifact_id,
                        )
                        .await?;
                    }
                    for association in &request.associations {
                        insert_association_if_not_exist(
                            mao,
                            association.context_id,
                            association.execution_id,
                        )
                        .await?;
                    }
                    Ok(PutAttributionsAndAssociationsResponse {})
                })
            })
            .await
    }

    pub async fn put_parent_contexts(
        &self,
        request: PutParentContextsRequest,
    ) -> StoreResult<PutParentContextsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    for parent_context in &request.parent_contexts {
                        mao.create_parent_context(parent_context).await?;
                    }
                    Ok(PutParentContextsResponse {})
                })
            })
            .await
    }

    // -- entity reads -----------------------------------------------------

    pub async fn get_artifacts(
        &self,
        request: GetArtifactsRequest,
    ) -> StoreResult<GetArtifactsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let page = match &request.options {
                        Some(options) => empty_if_not_found(mao.list_artifacts(options).await)?,
                        None => ListedPage {
                            items: empty_if_not_found(mao.find_artifacts().await)?,
                            next_page_token: None,
                        },
                    };
                    Ok(GetArtifactsResponse {
                        artifacts: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_artifacts_by_id(
        &self,
        request: GetArtifactsByIdRequest,
    ) -> StoreResult<GetArtifactsByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let artifacts = mao.find_artifacts_by_ids(&request.artifact_ids).await?;
                    Ok(GetArtifactsByIdResponse { artifacts })
                })
            })
            .await
    }

    pub async fn get_artifacts_by_type(
        &self,
        request: GetArtifactsByTypeRequest,
    ) -> StoreResult<GetArtifactsByTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Artifact,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetArtifactsByTypeResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let page = empty_if_not_found(
                        mao.find_artifacts_by_type_id(type_id, request.options.as_ref())
                            .await,
                    )?;
                    Ok(GetArtifactsByTypeResponse {
                        artifacts: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_artifact_by_type_and_name(
        &self,
        request: GetArtifactByTypeAndNameRequest,
    ) -> StoreResult<GetArtifactByTypeAndNameResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Artifact,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetArtifactByTypeAndNameResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let artifact = empty_if_not_found(
                        mao.find_artifact_by_type_id_and_name(type_id, &request.artifact_name)
                            .await
                            .map(Some),
                    )?;
                    Ok(GetArtifactByTypeAndNameResponse { artifact })
                })
            })
            .await
    }

    pub async fn get_artifacts_by_uri(
        &self,
        request: GetArtifactsByUriRequest,
    ) -> StoreResult<GetArtifactsByUriResponse> {
        // The scalar `uri` field was retired in favor of the repeated
        // `uris`; reject stale callers before opening a transaction.
        if request.uri.is_some() {
            return Err(StoreError::invalid_argument(
                "the request contains the retired field `uri`; populate the repeated `uris` \
                 field instead",
            ));
        }
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let mut response = GetArtifactsByUriResponse::default();
                    let mut seen = HashSet::new();
                    for uri in &request.uris {
                        if !seen.insert(uri.as_str()) {
                            continue;
                        }
                        let artifacts =
                            empty_if_not_found(mao.find_artifacts_by_uri(uri).await)?;
                        response.artifacts.extend(artifacts);
                    }
                    Ok(response)
                })
            })
            .await
    }

    pub async fn get_artifacts_by_context(
        &self,
        request: GetArtifactsByContextRequest,
    ) -> StoreResult<GetArtifactsByContextResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let page = mao
                        .find_artifacts_by_context(request.context_id, request.options.as_ref())
                        .await?;
                    Ok(GetArtifactsByContextResponse {
                        artifacts: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_executions(
        &self,
        request: GetExecutionsRequest,
    ) -> StoreResult<GetExecutionsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let page = match &request.options {
                        Some(options) => empty_if_not_found(mao.list_executions(options).await)?,
                        None => ListedPage {
                            items: empty_if_not_found(mao.find_executions().await)?,
                            next_page_token: None,
                        },
                    };
                    Ok(GetExecutionsResponse {
                        executions: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_executions_by_id(
        &self,
        request: GetExecutionsByIdRequest,
    ) -> StoreResult<GetExecutionsByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let executions = mao.find_executions_by_ids(&request.execution_ids).await?;
                    Ok(GetExecutionsByIdResponse { executions })
                })
            })
            .await
    }

    pub async fn get_executions_by_type(
        &self,
        request: GetExecutionsByTypeRequest,
    ) -> StoreResult<GetExecutionsByTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Execution,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetExecutionsByTypeResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let page = empty_if_not_found(
                        mao.find_executions_by_type_id(type_id, request.options.as_ref())
                            .await,
                    )?;
                    Ok(GetExecutionsByTypeResponse {
                        executions: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_execution_by_type_and_name(
        &self,
        request: GetExecutionByTypeAndNameRequest,
    ) -> StoreResult<GetExecutionByTypeAndNameResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Execution,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetExecutionByTypeAndNameResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let execution = empty_if_not_found(
                        mao.find_execution_by_type_id_and_name(type_id, &request.execution_name)
                            .await
                            .map(Some),
                    )?;
                    Ok(GetExecutionByTypeAndNameResponse { execution })
                })
            })
            .await
    }

    pub async fn get_executions_by_context(
        &self,
        request: GetExecutionsByContextRequest,
    ) -> StoreResult<GetExecutionsByContextResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let page = mao
                        .find_executions_by_context(request.context_id, request.options.as_ref())
                        .await?;
                    Ok(GetExecutionsByContextResponse {
                        executions: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_contexts(
        &self,
        request: GetContextsRequest,
    ) -> StoreResult<GetContextsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let page = match &request.options {
                        Some(options) => empty_if_not_found(mao.list_contexts(options).await)?,
                        None => ListedPage {
                            items: empty_if_not_found(mao.find_contexts().await)?,
                            next_page_token: None,
                        },
                    };
                    Ok(GetContextsResponse {
                        contexts: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_contexts_by_id(
        &self,
        request: GetContextsByIdRequest,
    ) -> StoreResult<GetContextsByIdResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let contexts = mao.find_contexts_by_ids(&request.context_ids).await?;
                    Ok(GetContextsByIdResponse { contexts })
                })
            })
            .await
    }

    pub async fn get_contexts_by_type(
        &self,
        request: GetContextsByTypeRequest,
    ) -> StoreResult<GetContextsByTypeResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Context,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetContextsByTypeResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let page = empty_if_not_found(
                        mao.find_contexts_by_type_id(type_id, request.options.as_ref())
                            .await,
                    )?;
                    Ok(GetContextsByTypeResponse {
                        contexts: page.items,
                        next_page_token: page.next_page_token,
                    })
                })
            })
            .await
    }

    pub async fn get_context_by_type_and_name(
        &self,
        request: GetContextByTypeAndNameRequest,
    ) -> StoreResult<GetContextByTypeAndNameResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let type_id = match mao
                        .find_type_id_by_name_and_version(
                            TypeKind::Context,
                            &request.type_name,
                            request_type_version(request.type_version.as_deref()),
                        )
                        .await
                    {
                        Ok(type_id) => type_id,
                        Err(err) if err.is_not_found() => {
                            return Ok(GetContextByTypeAndNameResponse::default());
                        }
                        Err(err) => return Err(err),
                    };
                    let context = empty_if_not_found(
                        mao.find_context_by_type_id_and_name(type_id, &request.context_name)
                            .await
                            .map(Some),
                    )?;
                    Ok(GetContextByTypeAndNameResponse { context })
                })
            })
            .await
    }

    pub async fn get_contexts_by_artifact(
        &self,
        request: GetContextsByArtifactRequest,
    ) -> StoreResult<GetContextsByArtifactResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let contexts = mao.find_contexts_by_artifact(request.artifact_id).await?;
                    Ok(GetContextsByArtifactResponse { contexts })
                })
            })
            .await
    }

    pub async fn get_contexts_by_execution(
        &self,
        request: GetContextsByExecutionRequest,
    ) -> StoreResult<GetContextsByExecutionResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let contexts = mao.find_contexts_by_execution(request.execution_id).await?;
                    Ok(GetContextsByExecutionResponse { contexts })
                })
            })
            .await
    }

    pub async fn get_parent_contexts_by_context(
        &self,
        request: GetParentContextsByContextRequest,
    ) -> StoreResult<GetParentContextsByContextResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let contexts = empty_if_not_found(
                        mao.find_parent_contexts_by_context_id(request.context_id)
                            .await,
                    )?;
                    Ok(GetParentContextsByContextResponse { contexts })
                })
            })
            .await
    }

    pub async fn get_children_contexts_by_context(
        &self,
        request: GetChildrenContextsByContextRequest,
    ) -> StoreResult<GetChildrenContextsByContextResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let contexts = empty_if_not_found(
                        mao.find_child_contexts_by_context_id(request.context_id)
                            .await,
                    )?;
                    Ok(GetChildrenContextsByContextResponse { contexts })
                })
            })
            .await
    }

    pub async fn get_events_by_artifact_ids(
        &self,
        request: GetEventsByArtifactIdsRequest,
    ) -> StoreResult<GetEventsByArtifactIdsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let events = empty_if_not_found(
                        mao.find_events_by_artifact_ids(&request.artifact_ids).await,
                    )?;
                    Ok(GetEventsByArtifactIdsResponse { events })
                })
            })
            .await
    }

    pub async fn get_events_by_execution_ids(
        &self,
        request: GetEventsByExecutionIdsRequest,
    ) -> StoreResult<GetEventsByExecutionIdsResponse> {
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let events = empty_if_not_found(
                        mao.find_events_by_execution_ids(&request.execution_ids)
                            .await,
                    )?;
                    Ok(GetEventsByExecutionIdsResponse { events })
                })
            })
            .await
    }

    // -- lineage ----------------------------------------------------------

    pub async fn get_lineage_graph(
        &self,
        request: GetLineageGraphRequest,
    ) -> StoreResult<GetLineageGraphResponse> {
        if request.options.artifacts_options.is_none() {
            return Err(StoreError::invalid_argument(
                "missing query_nodes conditions",
            ));
        }
        let max_num_hops = match request.options.stop_conditions.max_num_hops {
            Some(requested) if requested < 0 => {
                return Err(StoreError::invalid_argument(format!(
                    "max_num_hops cannot be negative: max_num_hops = {requested}"
                )));
            }
            Some(requested) => {
                if requested > MAX_LINEAGE_DISTANCE {
                    warn!(
                        "stop_conditions.max_num_hops: {requested} is greater than the maximum \
                         value allowed: {MAX_LINEAGE_DISTANCE}; using {MAX_LINEAGE_DISTANCE} to \
                         limit the size of the traversal"
                    );
                }
                requested.min(MAX_LINEAGE_DISTANCE)
            }
            None => {
                info!(
                    "stop_conditions.max_num_hops is not set; using the maximum value \
                     {MAX_LINEAGE_DISTANCE} to limit the size of the traversal"
                );
                MAX_LINEAGE_DISTANCE
            }
        };
        self.executor
            .execute(request.transaction_options.clone(), move |mao| {
                let request = request.clone();
                Box::pin(async move {
                    let Some(artifacts_options) = request.options.artifacts_options.as_ref()
                    else {
                        return Err(StoreError::invalid_argument(
                            "missing query_nodes conditions",
                        ));
                    };
                    let mut seeds: Vec<Artifact> =
                        mao.list_artifacts(artifacts_options).await?.items;
                    if seeds.is_empty() {
                        return Err(StoreError::not_found(
                            "the query_nodes condition does not match any nodes to do traversal",
                        ));
                    }
                    let max_node_size = request
                        .options
                        .max_node_size
                        .filter(|&max_node_size| max_node_size > 0);
                    if let Some(max_node_size) = max_node_size {
                        seeds.truncate(max_node_size as usize);
                    }
                    let stop_conditions = &request.options.stop_conditions;
                    let subgraph = mao
                        .query_lineage_graph(
                            &seeds,
                            max_num_hops,
                            max_node_size,
                            stop_conditions
                                .boundary_artifacts
                                .as_deref()
                                .filter(|condition| !condition.is_empty()),
                            stop_conditions
                                .boundary_executions
                                .as_deref()
                                .filter(|condition| !condition.is_empty()),
                        )
                        .await?;
                    Ok(GetLineageGraphResponse { subgraph })
                })
            })
            .await
    }
}
