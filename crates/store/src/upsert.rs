//! Idempotent upsert helpers shared by the entity write paths.
//!
//! Presence of an id selects update over create; links are insert-if-absent.

use crate::api::ArtifactAndEvent;
use crate::entities::{Artifact, Association, Attribution, Context, Execution};
use crate::mao::MetadataAccessObject;
use crate::{StoreError, StoreResult};

pub(crate) async fn upsert_artifact(
    mao: &dyn MetadataAccessObject,
    artifact: &Artifact,
) -> StoreResult<i64> {
    match artifact.id {
        Some(id) => {
            mao.update_artifact(artifact).await?;
            Ok(id)
        }
        None => mao.create_artifact(artifact).await,
    }
}

pub(crate) async fn upsert_execution(
    mao: &dyn MetadataAccessObject,
    execution: &Execution,
) -> StoreResult<i64> {
    match execution.id {
        Some(id) => {
            mao.update_execution(execution).await?;
            Ok(id)
        }
        None => mao.create_execution(execution).await,
    }
}

pub(crate) async fn upsert_context(
    mao: &dyn MetadataAccessObject,
    context: &Context,
) -> StoreResult<i64> {
    match context.id {
        Some(id) => {
            mao.update_context(context).await?;
            Ok(id)
        }
        None => mao.create_context(context).await,
    }
}

/// Upserts one artifact/event pair and returns the effective artifact id.
///
/// A pair with neither side is a no-op and yields no id. Without an artifact
/// the event must name its artifact; with both present the ids must align.
/// The event, when given, is created against the effective artifact id.
pub(crate) async fn upsert_artifact_and_event(
    mao: &dyn MetadataAccessObject,
    pair: &ArtifactAndEvent,
) -> StoreResult<Option<i64>> {
    if pair.artifact.is_none() && pair.event.is_none() {
        return Ok(None);
    }
    let event_artifact_id = pair.event.as_ref().and_then(|event| event.artifact_id);
    if pair.artifact.is_none() && event_artifact_id.is_none() {
        return Err(StoreError::invalid_argument(
            "if no artifact is present, the given event must have an artifact_id",
        ));
    }
    let request_artifact_id = pair.artifact.as_ref().and_then(|artifact| artifact.id);
    if pair.artifact.is_some()
        && event_artifact_id.is_some()
        && request_artifact_id != event_artifact_id
    {
        return Err(StoreError::invalid_argument(
            "event.artifact_id is not aligned with the given artifact",
        ));
    }
    let mut artifact_id = None;
    if let Some(artifact) = &pair.artifact {
        artifact_id = Some(upsert_artifact(mao, artifact).await?);
    }
    let Some(event) = &pair.event else {
        return Ok(artifact_id);
    };
    let effective_id = artifact_id.or(event_artifact_id);
    let mut event = event.clone();
    event.artifact_id = effective_id;
    mao.create_event(&event).await?;
    Ok(effective_id)
}

/// Creates the association unless the pair already exists.
pub(crate) async fn insert_association_if_not_exist(
    mao: &dyn MetadataAccessObject,
    context_id: i64,
    execution_id: i64,
) -> StoreResult<()> {
    let association = Association {
        context_id,
        execution_id,
    };
    match mao.create_association(&association).await {
        Ok(_) => Ok(()),
        Err(err) if err.is_already_exists() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Creates the attribution unless the pair already exists.
pub(crate) async fn insert_attribution_if_not_exist(
    mao: &dyn MetadataAccessObject,
    context_id: i64,
    artifact_id: i64,
) -> StoreResult<()> {
    let attribution = Attribution {
        context_id,
        artifact_id,
    };
    match mao.create_attribution(&attribution).await {
        Ok(_) => Ok(()),
        Err(err) if err.is_already_exists() => Ok(()),
        Err(err) => Err(err),
    }
}
