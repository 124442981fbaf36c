//! Compound write of one execution together with its artifacts, events,
//! contexts, and membership links, inside a single transaction.

use crate::api::{PutExecutionRequest, PutExecutionResponse};
use crate::mao::MetadataAccessObject;
use crate::upsert::{
    insert_association_if_not_exist, insert_attribution_if_not_exist, upsert_artifact_and_event,
    upsert_context, upsert_execution,
};
use crate::{StoreError, StoreResult};

/// Runs the compound execution write. Any failing step fails the whole unit
/// and the surrounding transaction rolls the rest back.
pub(crate) async fn put_execution(
    mao: &dyn MetadataAccessObject,
    request: &PutExecutionRequest,
) -> StoreResult<PutExecutionResponse> {
    let Some(execution) = &request.execution else {
        return Err(StoreError::invalid_argument(
            "no execution is found in the request",
        ));
    };
    let mut response = PutExecutionResponse::default();

    // 1. The execution itself.
    let execution_id = upsert_execution(mao, execution).await?;
    response.execution_id = execution_id;

    // 2. Artifacts and their events.
    for pair in &request.artifact_event_pairs {
        let mut pair = pair.clone();
        if let Some(event) = pair.event.as_mut() {
            if let Some(event_execution_id) = event.execution_id {
                if execution.id != Some(event_execution_id) {
                    return Err(StoreError::invalid_argument(format!(
                        "event.execution_id {event_execution_id} does not match the given execution"
                    )));
                }
            }
            event.execution_id = Some(execution_id);
        }
        if let Some(artifact_id) = upsert_artifact_and_event(mao, &pair).await? {
            response.artifact_ids.push(artifact_id);
        }
    }

    // 3. Contexts, associations, and attributions.
    for context in &request.contexts {
        let reuse = request.options.reuse_context_if_already_exist;
        let mut context_id = None;
        if reuse && context.id.is_none() {
            if let Some(type_id) = context.type_id {
                match mao
                    .find_context_by_type_id_and_name(type_id, &context.name)
                    .await
                {
                    Ok(existing) => context_id = existing.id,
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err),
                }
            }
        }
        let context_id = match context_id {
            Some(id) => id,
            None => match upsert_context(mao, context).await {
                Ok(id) => id,
                // Two writers racing to create the same new context: surface
                // an abort and let the caller retry into the reuse path.
                Err(err) if reuse && err.is_already_exists() => {
                    return Err(StoreError::aborted(format!(
                        "concurrent creation of context `{}`; retry the transaction to reuse it",
                        context.name
                    )));
                }
                Err(err) => return Err(err),
            },
        };
        response.context_ids.push(context_id);
        insert_association_if_not_exist(mao, context_id, execution_id).await?;
        for &artifact_id in &response.artifact_ids {
            insert_attribution_if_not_exist(mao, context_id, artifact_id).await?;
        }
    }
    Ok(response)
}
