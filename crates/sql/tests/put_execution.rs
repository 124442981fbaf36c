mod support;

use lineal_store::{
    Artifact, ArtifactAndEvent, Context, Event, EventType, Execution,
    GetArtifactsByContextRequest, GetArtifactsRequest, GetContextsByArtifactRequest,
    GetEventsByExecutionIdsRequest, GetExecutionsByContextRequest,
    PutAttributionsAndAssociationsRequest, PutContextsRequest, PutExecutionOptions,
    PutExecutionRequest, StoreResult,
};
use support::{new_store, seed_graph_types};

fn pair(artifact_type_id: i64, uri: &str) -> ArtifactAndEvent {
    ArtifactAndEvent {
        artifact: Some(Artifact {
            type_id: Some(artifact_type_id),
            uri: Some(uri.into()),
            ..Artifact::default()
        }),
        event: Some(Event {
            event_type: EventType::Output,
            ..Event::default()
        }),
    }
}

#[tokio::test]
async fn compound_write_links_everything() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (artifact_type_id, execution_type_id, context_type_id) = seed_graph_types(&store).await;

    let response = store
        .put_execution(PutExecutionRequest {
            execution: Some(Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }),
            artifact_event_pairs: vec![
                pair(artifact_type_id, "/out/1"),
                pair(artifact_type_id, "/out/2"),
            ],
            contexts: vec![Context {
                type_id: Some(context_type_id),
                name: "run-1".into(),
                ..Context::default()
            }],
            options: PutExecutionOptions {
                reuse_context_if_already_exist: true,
            },
            ..PutExecutionRequest::default()
        })
        .await?;
    assert_eq!(response.artifact_ids.len(), 2);
    assert_eq!(response.context_ids.len(), 1);
    let context_id = response.context_ids[0];

    let executions = store
        .get_executions_by_context(GetExecutionsByContextRequest {
            context_id,
            ..GetExecutionsByContextRequest::default()
        })
        .await?
        .executions;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].id, Some(response.execution_id));

    let artifacts = store
        .get_artifacts_by_context(GetArtifactsByContextRequest {
            context_id,
            ..GetArtifactsByContextRequest::default()
        })
        .await?
        .artifacts;
    assert_eq!(artifacts.len(), 2);

    let events = store
        .get_events_by_execution_ids(GetEventsByExecutionIdsRequest {
            execution_ids: vec![response.execution_id],
            ..GetEventsByExecutionIdsRequest::default()
        })
        .await?
        .events;
    assert_eq!(events.len(), 2);
    Ok(())
}

#[tokio::test]
async fn context_reuse_resolves_to_the_existing_row() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (_, execution_type_id, context_type_id) = seed_graph_types(&store).await;

    let existing_id = store
        .put_contexts(PutContextsRequest {
            contexts: vec![Context {
                type_id: Some(context_type_id),
                name: "shared-run".into(),
                ..Context::default()
            }],
            ..PutContextsRequest::default()
        })
        .await?
        .context_ids[0];

    let response = store
        .put_execution(PutExecutionRequest {
            execution: Some(Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }),
            contexts: vec![Context {
                type_id: Some(context_type_id),
                name: "shared-run".into(),
                ..Context::default()
            }],
            options: PutExecutionOptions {
                reuse_context_if_already_exist: true,
            },
            ..PutExecutionRequest::default()
        })
        .await?;
    assert_eq!(response.context_ids, vec![existing_id]);

    // Without the reuse option, the same write is a conflict.
    let err = store
        .put_execution(PutExecutionRequest {
            execution: Some(Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }),
            contexts: vec![Context {
                type_id: Some(context_type_id),
                name: "shared-run".into(),
                ..Context::default()
            }],
            ..PutExecutionRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    Ok(())
}

#[tokio::test]
async fn failed_compound_write_rolls_back() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (artifact_type_id, execution_type_id, _) = seed_graph_types(&store).await;

    let err = store
        .put_execution(PutExecutionRequest {
            execution: Some(Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }),
            artifact_event_pairs: vec![pair(artifact_type_id, "/out/1")],
            contexts: vec![Context {
                type_id: Some(424_242),
                name: "doomed".into(),
                ..Context::default()
            }],
            ..PutExecutionRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let artifacts = store
        .get_artifacts(GetArtifactsRequest::default())
        .await?
        .artifacts;
    assert!(artifacts.is_empty(), "rolled-back rows are observable");
    Ok(())
}

#[tokio::test]
async fn attribution_and_association_inserts_are_idempotent() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (artifact_type_id, execution_type_id, context_type_id) = seed_graph_types(&store).await;

    let response = store
        .put_execution(PutExecutionRequest {
            execution: Some(Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }),
            artifact_event_pairs: vec![pair(artifact_type_id, "/out/1")],
            contexts: vec![Context {
                type_id: Some(context_type_id),
                name: "run-1".into(),
                ..Context::default()
            }],
            ..PutExecutionRequest::default()
        })
        .await?;
    let context_id = response.context_ids[0];
    let artifact_id = response.artifact_ids[0];

    // Re-linking the same pairs is a no-op, not a conflict.
    store
        .put_attributions_and_associations(PutAttributionsAndAssociationsRequest {
            attributions: vec![lineal_store::Attribution {
                context_id,
                artifact_id,
            }],
            associations: vec![lineal_store::Association {
                context_id,
                execution_id: response.execution_id,
            }],
            ..PutAttributionsAndAssociationsRequest::default()
        })
        .await?;

    let contexts = store
        .get_contexts_by_artifact(GetContextsByArtifactRequest {
            artifact_id,
            ..GetContextsByArtifactRequest::default()
        })
        .await?
        .contexts;
    assert_eq!(contexts.len(), 1);
    Ok(())
}
