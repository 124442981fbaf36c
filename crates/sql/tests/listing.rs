mod support;

use std::collections::HashSet;

use lineal_store::{
    Artifact, Context, GetArtifactsRequest, GetChildrenContextsByContextRequest,
    GetContextByTypeAndNameRequest, GetContextsByTypeRequest, GetParentContextsByContextRequest,
    ListOperationOptions, OrderBy, OrderByField, ParentContext, PutArtifactsRequest,
    PutContextsRequest, PutParentContextsRequest, StoreResult,
};
use support::{new_store, put_artifact_type, seed_graph_types, typed};

#[tokio::test]
async fn paging_walks_the_set_exactly_once() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    let artifacts = (0..5)
        .map(|index| Artifact {
            type_id: Some(type_id),
            name: Some(format!("model-{index}")),
            ..Artifact::default()
        })
        .collect();
    let created = store
        .put_artifacts(PutArtifactsRequest {
            artifacts,
            ..PutArtifactsRequest::default()
        })
        .await?
        .artifact_ids;

    let mut seen = HashSet::new();
    let mut token = None;
    let mut pages = 0;
    loop {
        let response = store
            .get_artifacts(GetArtifactsRequest {
                options: Some(ListOperationOptions {
                    max_result_size: Some(2),
                    next_page_token: token.clone(),
                    ..ListOperationOptions::default()
                }),
                ..GetArtifactsRequest::default()
            })
            .await?;
        assert!(response.artifacts.len() <= 2);
        for artifact in &response.artifacts {
            assert!(seen.insert(artifact.id.unwrap()), "duplicate row in paging");
        }
        pages += 1;
        match response.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    assert_eq!(seen.len(), created.len());
    assert_eq!(pages, 3);
    Ok(())
}

#[tokio::test]
async fn descending_order_by_id_reverses_the_walk() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let type_id = put_artifact_type(&store, typed("Model", &[])).await;
    store
        .put_artifacts(PutArtifactsRequest {
            artifacts: (0..3)
                .map(|index| Artifact {
                    type_id: Some(type_id),
                    name: Some(format!("model-{index}")),
                    ..Artifact::default()
                })
                .collect(),
            ..PutArtifactsRequest::default()
        })
        .await?;

    let response = store
        .get_artifacts(GetArtifactsRequest {
            options: Some(ListOperationOptions {
                order_by: Some(OrderBy {
                    field: OrderByField::Id,
                    is_asc: false,
                }),
                ..ListOperationOptions::default()
            }),
            ..GetArtifactsRequest::default()
        })
        .await?;
    let ids: Vec<i64> = response
        .artifacts
        .iter()
        .map(|artifact| artifact.id.unwrap())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
    Ok(())
}

#[tokio::test]
async fn malformed_page_tokens_are_rejected() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let err = store
        .get_artifacts(GetArtifactsRequest {
            options: Some(ListOperationOptions {
                max_result_size: Some(2),
                next_page_token: Some("not-a-token".into()),
                ..ListOperationOptions::default()
            }),
            ..GetArtifactsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
    Ok(())
}

#[tokio::test]
async fn contexts_enforce_name_uniqueness_per_type() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (_, _, context_type_id) = seed_graph_types(&store).await;
    let context = Context {
        type_id: Some(context_type_id),
        name: "run-1".into(),
        ..Context::default()
    };
    store
        .put_contexts(PutContextsRequest {
            contexts: vec![context.clone()],
            ..PutContextsRequest::default()
        })
        .await?;
    let err = store
        .put_contexts(PutContextsRequest {
            contexts: vec![context],
            ..PutContextsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    let fetched = store
        .get_context_by_type_and_name(GetContextByTypeAndNameRequest {
            type_name: "Experiment".into(),
            context_name: "run-1".into(),
            ..GetContextByTypeAndNameRequest::default()
        })
        .await?
        .context;
    assert_eq!(fetched.unwrap().name, "run-1");

    let listed = store
        .get_contexts_by_type(GetContextsByTypeRequest {
            type_name: "Experiment".into(),
            ..GetContextsByTypeRequest::default()
        })
        .await?
        .contexts;
    assert_eq!(listed.len(), 1);
    Ok(())
}

#[tokio::test]
async fn parent_context_links_are_directional_and_unique() -> StoreResult<()> {
    let (_dir, store) = new_store().await;
    let (_, _, context_type_id) = seed_graph_types(&store).await;
    let context_ids = store
        .put_contexts(PutContextsRequest {
            contexts: ["parent", "child"]
                .into_iter()
                .map(|name| Context {
                    type_id: Some(context_type_id),
                    name: name.into(),
                    ..Context::default()
                })
                .collect(),
            ..PutContextsRequest::default()
        })
        .await?
        .context_ids;
    let (parent_id, child_id) = (context_ids[0], context_ids[1]);

    let link = ParentContext {
        child_id,
        parent_id,
    };
    store
        .put_parent_contexts(PutParentContextsRequest {
            parent_contexts: vec![link],
            ..PutParentContextsRequest::default()
        })
        .await?;

    let parents = store
        .get_parent_contexts_by_context(GetParentContextsByContextRequest {
            context_id: child_id,
            ..GetParentContextsByContextRequest::default()
        })
        .await?
        .contexts;
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].name, "parent");

    let children = store
        .get_children_contexts_by_context(GetChildrenContextsByContextRequest {
            context_id: parent_id,
            ..GetChildrenContextsByContextRequest::default()
        })
        .await?
        .contexts;
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "child");

    // Parent-context links are insert-only; duplicates are surfaced.
    let err = store
        .put_parent_contexts(PutParentContextsRequest {
            parent_contexts: vec![link],
            ..PutParentContextsRequest::default()
        })
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    Ok(())
}
