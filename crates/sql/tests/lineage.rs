mod support;

use lineal_store::{
    Artifact, BoundaryConstraint, Event, EventType, Execution, GetLineageGraphRequest,
    LineageGraphQueryOptions, ListOperationOptions, PutArtifactsRequest, PutEventsRequest,
    PutExecutionsRequest, StoreResult,
};
use support::{new_store, seed_graph_types, SqlStore};

/// Builds the chain a0 -> e0 -> a1 -> e1 -> a2 and returns the artifact ids.
async fn seed_chain(store: &SqlStore) -> StoreResult<Vec<i64>> {
    let (artifact_type_id, execution_type_id, _) = seed_graph_types(store).await;
    let artifact_ids = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: (0..3)
                .map(|index| Artifact {
                    type_id: Some(artifact_type_id),
                    name: Some(format!("node-{index}")),
                    ..Artifact::default()
                })
                .collect(),
            ..PutArtifactsRequest::default()
        })
        .await?
        .artifact_ids;
    let execution_ids = store
        .put_executions(PutExecutionsRequest {
            executions: (0..2)
                .map(|index| Execution {
                    type_id: Some(execution_type_id),
                    name: Some(format!("step-{index}")),
                    ..Execution::default()
                })
                .collect(),
            ..PutExecutionsRequest::default()
        })
        .await?
        .execution_ids;
    let mut events = Vec::new();
    for step in 0..2 {
        events.push(Event {
            artifact_id: Some(artifact_ids[step]),
            execution_id: Some(execution_ids[step]),
            event_type: EventType::Input,
            path: Vec::new(),
            milliseconds_since_epoch: 0,
        });
        events.push(Event {
            artifact_id: Some(artifact_ids[step + 1]),
            execution_id: Some(execution_ids[step]),
            event_type: EventType::Output,
            path: Vec::new(),
            milliseconds_since_epoch: 0,
        });
    }
    store
        .put_events(PutEventsRequest {
            events,
            ..PutEventsRequest::default()
        })
        .await?;
    Ok(artifact_ids)
}

fn seed_options(seed_count: i32) -> LineageGraphQueryOptions {
    LineageGraphQueryOptions {
        artifacts_options: Some(ListOperationOptions {
            max_result_size: Some(seed_count),
            ..ListOperationOptions::default()
        }),
        ..LineageGraphQueryOptions::default()
    }
}

#[tokio::test]
async fn traversal_is_bounded_by_hop_count() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let artifact_ids = seed_chain(&store).await?;

    // One hop from the first artifact reaches its execution and stops.
    let mut options = seed_options(1);
    options.stop_conditions.max_num_hops = Some(1);
    let graph = store
        .get_lineage_graph(GetLineageGraphRequest {
            options,
            ..GetLineageGraphRequest::default()
        })
        .await?
        .subgraph;
    assert_eq!(graph.artifacts.len(), 1);
    assert_eq!(graph.executions.len(), 1);
    assert_eq!(graph.events.len(), 1);
    assert_eq!(graph.artifacts[0].id, Some(artifact_ids[0]));

    // Unbounded hops cover the whole chain.
    let graph = store
        .get_lineage_graph(GetLineageGraphRequest {
            options: seed_options(1),
            ..GetLineageGraphRequest::default()
        })
        .await?
        .subgraph;
    assert_eq!(graph.artifacts.len(), 3);
    assert_eq!(graph.executions.len(), 2);
    assert_eq!(graph.events.len(), 4);
    assert_eq!(graph.artifact_types.len(), 1);
    assert_eq!(graph.execution_types.len(), 1);
    Ok(())
}

#[tokio::test]
async fn node_budget_truncates_the_expansion() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    seed_chain(&store).await?;

    let mut options = seed_options(1);
    options.max_node_size = Some(2);
    let graph = store
        .get_lineage_graph(GetLineageGraphRequest {
            options,
            ..GetLineageGraphRequest::default()
        })
        .await?
        .subgraph;
    assert!(graph.artifacts.len() + graph.executions.len() <= 2);
    Ok(())
}

#[tokio::test]
async fn traversal_validations() -> StoreResult<()> {
    let (_dir, store) = new_store().await;

    // Seed conditions are mandatory.
    let err = store
        .get_lineage_graph(GetLineageGraphRequest::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    // Negative hop counts are rejected before any work happens.
    let mut options = seed_options(1);
    options.stop_conditions.max_num_hops = Some(-1);
    let err = store
        .get_lineage_graph(GetLineageGraphRequest {
            options,
            ..GetLineageGraphRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    // An empty seed set is a not-found traversal.
    let err = store
        .get_lineage_graph(GetLineageGraphRequest {
            options: seed_options(5),
            ..GetLineageGraphRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Boundary predicates are not supported by this backend.
    seed_chain(&store).await?;
    let options = LineageGraphQueryOptions {
        artifacts_options: Some(ListOperationOptions::default()),
        stop_conditions: BoundaryConstraint {
            boundary_artifacts: Some("uri = '/x'".into()),
            ..BoundaryConstraint::default()
        },
        ..LineageGraphQueryOptions::default()
    };
    let err = store
        .get_lineage_graph(GetLineageGraphRequest {
            options,
            ..GetLineageGraphRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_unimplemented());
    Ok(())
}
