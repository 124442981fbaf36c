mod support;

use lineal_store::{
    Artifact, ArtifactState, Event, EventStep, EventType, Execution, GetArtifactByTypeAndNameRequest,
    GetArtifactsByIdRequest, GetArtifactsByTypeRequest, GetArtifactsByUriRequest,
    GetEventsByArtifactIdsRequest, GetEventsByExecutionIdsRequest, PropertyType, PropertyValue,
    PutArtifactsOptions, PutArtifactsRequest, PutEventsRequest, PutExecutionsRequest,
    StoreResult,
};
use support::{new_store, put_artifact_type, seed_graph_types, typed};

#[tokio::test]
async fn artifact_round_trips_through_storage() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(
        &store,
        typed("Model", &[("step", PropertyType::Int), ("loss", PropertyType::Double)]),
    )
    .await;

    let mut artifact = Artifact {
        type_id: Some(type_id),
        uri: Some("s3://models/alpha".into()),
        name: Some("alpha".into()),
        state: Some(ArtifactState::Live),
        ..Artifact::default()
    };
    artifact.properties.insert("step".into(), PropertyValue::Int(7));
    artifact
        .properties
        .insert("loss".into(), PropertyValue::Double(0.25));
    artifact
        .custom_properties
        .insert("note".into(), PropertyValue::String("first".into()));

    let artifact_id = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![artifact.clone()],
            ..PutArtifactsRequest::default()
        })
        .await?
        .artifact_ids[0];

    let fetched = store
        .get_artifacts_by_id(GetArtifactsByIdRequest {
            artifact_ids: vec![artifact_id],
            ..GetArtifactsByIdRequest::default()
        })
        .await?
        .artifacts
        .remove(0);
    assert_eq!(fetched.id, Some(artifact_id));
    assert_eq!(fetched.uri, artifact.uri);
    assert_eq!(fetched.name, artifact.name);
    assert_eq!(fetched.state, Some(ArtifactState::Live));
    assert_eq!(fetched.properties, artifact.properties);
    assert_eq!(fetched.custom_properties, artifact.custom_properties);
    assert!(fetched.create_time_since_epoch > 0);
    assert_eq!(
        fetched.create_time_since_epoch,
        fetched.last_update_time_since_epoch
    );
    Ok(())
}

#[tokio::test]
async fn get_by_id_propagates_missing_ids() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let err = store
        .get_artifacts_by_id(GetArtifactsByIdRequest {
            artifact_ids: vec![12345],
            ..GetArtifactsByIdRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn lookups_by_type_name_and_uri() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    let artifacts = vec![
        Artifact {
            type_id: Some(type_id),
            name: Some("alpha".into()),
            uri: Some("s3://models/shared".into()),
            ..Artifact::default()
        },
        Artifact {
            type_id: Some(type_id),
            name: Some("beta".into()),
            uri: Some("s3://models/shared".into()),
            ..Artifact::default()
        },
    ];
    store
        .put_artifacts(PutArtifactsRequest {
            artifacts,
            ..PutArtifactsRequest::default()
        })
        .await?;

    let by_type = store
        .get_artifacts_by_type(GetArtifactsByTypeRequest {
            type_name: "Model".into(),
            ..GetArtifactsByTypeRequest::default()
        })
        .await?
        .artifacts;
    assert_eq!(by_type.len(), 2);

    let by_name = store
        .get_artifact_by_type_and_name(GetArtifactByTypeAndNameRequest {
            type_name: "Model".into(),
            artifact_name: "beta".into(),
            ..GetArtifactByTypeAndNameRequest::default()
        })
        .await?
        .artifact;
    assert_eq!(by_name.unwrap().name.as_deref(), Some("beta"));

    let by_uri = store
        .get_artifacts_by_uri(GetArtifactsByUriRequest {
            // Duplicated uris are deduplicated before the lookup.
            uris: vec!["s3://models/shared".into(), "s3://models/shared".into()],
            ..GetArtifactsByUriRequest::default()
        })
        .await?
        .artifacts;
    assert_eq!(by_uri.len(), 2);

    let unknown_type = store
        .get_artifacts_by_type(GetArtifactsByTypeRequest {
            type_name: "NoSuchType".into(),
            ..GetArtifactsByTypeRequest::default()
        })
        .await?;
    assert!(unknown_type.artifacts.is_empty());
    Ok(())
}

#[tokio::test]
async fn duplicate_artifact_names_conflict_within_a_type() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    let named = Artifact {
        type_id: Some(type_id),
        name: Some("alpha".into()),
        ..Artifact::default()
    };
    store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![named.clone()],
            ..PutArtifactsRequest::default()
        })
        .await?;
    let err = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![named],
            ..PutArtifactsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    Ok(())
}

#[tokio::test]
async fn optimistic_update_rejects_stale_timestamps() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    let artifact_id = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![Artifact {
                type_id: Some(type_id),
                ..Artifact::default()
            }],
            ..PutArtifactsRequest::default()
        })
        .await?
        .artifact_ids[0];

    let stored = store
        .get_artifacts_by_id(GetArtifactsByIdRequest {
            artifact_ids: vec![artifact_id],
            ..GetArtifactsByIdRequest::default()
        })
        .await?
        .artifacts
        .remove(0);
    let first_seen = stored.last_update_time_since_epoch;

    // A matching timestamp wins and the stored one strictly advances.
    store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![stored.clone()],
            options: PutArtifactsOptions {
                abort_if_latest_updated_time_changed: true,
            },
            ..PutArtifactsRequest::default()
        })
        .await?;
    let updated = store
        .get_artifacts_by_id(GetArtifactsByIdRequest {
            artifact_ids: vec![artifact_id],
            ..GetArtifactsByIdRequest::default()
        })
        .await?
        .artifacts
        .remove(0);
    assert!(updated.last_update_time_since_epoch > first_seen);

    // The loser still carrying the old timestamp is turned away.
    let err = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![stored],
            options: PutArtifactsOptions {
                abort_if_latest_updated_time_changed: true,
            },
            ..PutArtifactsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_failed_precondition());
    let message = err.to_string();
    assert!(message.contains(&first_seen.to_string()));
    assert!(message.contains(&updated.last_update_time_since_epoch.to_string()));
    Ok(())
}

#[tokio::test]
async fn events_round_trip_as_a_multiset() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (artifact_type_id, execution_type_id, _) = seed_graph_types(&store).await;

    let artifact_id = store
        .put_artifacts(PutArtifactsRequest {
            artifacts: vec![Artifact {
                type_id: Some(artifact_type_id),
                ..Artifact::default()
            }],
            ..PutArtifactsRequest::default()
        })
        .await?
        .artifact_ids[0];
    let execution_id = store
        .put_executions(PutExecutionsRequest {
            executions: vec![Execution {
                type_id: Some(execution_type_id),
                ..Execution::default()
            }],
            ..PutExecutionsRequest::default()
        })
        .await?
        .execution_ids[0];

    let events = vec![
        Event {
            artifact_id: Some(artifact_id),
            execution_id: Some(execution_id),
            event_type: EventType::Input,
            path: vec![EventStep::Key("training".into()), EventStep::Index(0)],
            milliseconds_since_epoch: 1_000,
        },
        Event {
            artifact_id: Some(artifact_id),
            execution_id: Some(execution_id),
            event_type: EventType::Output,
            path: Vec::new(),
            milliseconds_since_epoch: 2_000,
        },
    ];
    store
        .put_events(PutEventsRequest {
            events: events.clone(),
            ..PutEventsRequest::default()
        })
        .await?;

    let by_execution = store
        .get_events_by_execution_ids(GetEventsByExecutionIdsRequest {
            execution_ids: vec![execution_id],
            ..GetEventsByExecutionIdsRequest::default()
        })
        .await?
        .events;
    assert_eq!(by_execution, events);

    let by_artifact = store
        .get_events_by_artifact_ids(GetEventsByArtifactIdsRequest {
            artifact_ids: vec![artifact_id],
            ..GetEventsByArtifactIdsRequest::default()
        })
        .await?
        .events;
    assert_eq!(by_artifact.len(), 2);

    // Events for unknown endpoints are rejected.
    let err = store
        .put_events(PutEventsRequest {
            events: vec![Event {
                artifact_id: Some(999),
                execution_id: Some(execution_id),
                ..Event::default()
            }],
            ..PutEventsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
    Ok(())
}
