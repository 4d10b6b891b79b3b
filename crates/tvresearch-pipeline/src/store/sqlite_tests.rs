use super::*;
use crate::stage::StageKind;

async fn store() -> SqliteRecordStore {
    SqliteRecordStore::in_memory().await.unwrap()
}

#[tokio::test]
async fn test_create_and_get() {
    let store = store().await;
    let id = store.create(Some("climate".to_string())).await.unwrap();

    let record = store.get(id).await.unwrap();
    assert_eq!(record.id, id);
    assert_eq!(record.topic.as_deref(), Some("climate"));
    assert_eq!(record.status, WorkflowStatus::Queued);
    assert!(record.completed_at.is_none());
    assert!(record.result_content.is_none());
}

#[tokio::test]
async fn test_create_without_topic() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    assert!(store.get(id).await.unwrap().topic.is_none());
}

#[tokio::test]
async fn test_get_missing() {
    let store = store().await;
    assert!(matches!(store.get(42).await, Err(StoreError::NotFound(42))));
}

#[tokio::test]
async fn test_get_is_idempotent() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await
        .unwrap();

    let first = store.get(id).await.unwrap();
    let second = store.get(id).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_list_order_and_paging() {
    let store = store().await;
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(store.create(None).await.unwrap());
    }
    ids.reverse();

    let all: Vec<RecordId> = store.list(50, 0).await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(all, ids);

    let page: Vec<RecordId> = store.list(2, 1).await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(page, ids[1..3].to_vec());

    assert!(store.list(10, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle() {
    let store = store().await;
    let id = store.create(Some("AI".to_string())).await.unwrap();

    for stage in StageKind::ALL {
        store
            .update_status(id, StatusUpdate::running(stage))
            .await
            .unwrap();
        store
            .update_status(
                id,
                StatusUpdate::stage_completed(stage, format!("{} output", stage)),
            )
            .await
            .unwrap();
    }

    let record = store.get(id).await.unwrap();
    assert_eq!(record.status, WorkflowStatus::Completed);
    assert_eq!(record.result_content.as_deref(), Some("final_reporting output"));
    assert!(record.completed_at.is_some());
    assert!(record.execution_time_seconds.unwrap() >= 0);
    assert!(record.error_message.is_none());
}

#[tokio::test]
async fn test_partial_update_preserves_result() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await
        .unwrap();
    store
        .update_status(id, StatusUpdate::stage_completed(StageKind::TrendResearch, "trends"))
        .await
        .unwrap();

    let record = store
        .update_status(id, StatusUpdate::running(StageKind::NewsAggregation))
        .await
        .unwrap();
    assert_eq!(record.result_content.as_deref(), Some("trends"));
}

#[tokio::test]
async fn test_failure_sets_completion_fields() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await
        .unwrap();

    let record = store
        .update_status(id, StatusUpdate::failed("capability unavailable"))
        .await
        .unwrap();
    assert_eq!(record.status, WorkflowStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("capability unavailable"));
    assert!(record.completed_at.is_some());
    assert!(record.execution_time_seconds.is_some());

    assert_eq!(store.get(id).await.unwrap(), record);
}

#[tokio::test]
async fn test_terminal_record_is_frozen() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store.update_status(id, StatusUpdate::failed("boom")).await.unwrap();
    let frozen = store.get(id).await.unwrap();

    let result = store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidTransition {
            from: WorkflowStatus::Failed,
            ..
        })
    ));
    let result = store.update_status(id, StatusUpdate::failed("again")).await;
    assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));

    assert_eq!(store.get(id).await.unwrap(), frozen);
}

#[tokio::test]
async fn test_backward_transition_rejected() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await
        .unwrap();
    store
        .update_status(id, StatusUpdate::stage_completed(StageKind::TrendResearch, "t"))
        .await
        .unwrap();

    let result = store
        .update_status(id, StatusUpdate::running(StageKind::TrendResearch))
        .await;
    assert!(matches!(result, Err(StoreError::InvalidTransition { .. })));
    assert_eq!(
        store.get(id).await.unwrap().status,
        WorkflowStatus::TrendResearchCompleted
    );
}

#[tokio::test]
async fn test_update_missing_record() {
    let store = store().await;
    let result = store
        .update_status(5, StatusUpdate::running(StageKind::TrendResearch))
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(5))));
}

#[tokio::test]
async fn test_job_reference() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store.set_job_reference(id, "job-abc".to_string()).await.unwrap();
    assert_eq!(
        store.get(id).await.unwrap().job_reference.as_deref(),
        Some("job-abc")
    );

    assert!(matches!(
        store.set_job_reference(99, "x".to_string()).await,
        Err(StoreError::NotFound(99))
    ));
}

#[tokio::test]
async fn test_delete() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store.delete(id).await.unwrap();

    assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
    assert!(matches!(store.delete(id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_ids_not_reused_after_delete() {
    let store = store().await;
    let first = store.create(None).await.unwrap();
    store.delete(first).await.unwrap();
    let second = store.create(None).await.unwrap();
    assert!(second > first);
}

#[tokio::test]
async fn test_file_backed_store_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("research.db");

    let id = {
        let store = SqliteRecordStore::open(&path).await.unwrap();
        let id = store.create(Some("persisted".to_string())).await.unwrap();
        store.update_status(id, StatusUpdate::failed("stopped")).await.unwrap();
        id
    };

    let reopened = SqliteRecordStore::open(&path).await.unwrap();
    let record = reopened.get(id).await.unwrap();
    assert_eq!(record.topic.as_deref(), Some("persisted"));
    assert_eq!(record.status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn test_unknown_status_is_an_error() {
    let store = store().await;
    let id = store.create(None).await.unwrap();
    store
        .conn
        .call(move |conn| {
            conn.execute(
                "UPDATE research_results SET status = 'processing' WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(matches!(store.get(id).await, Err(StoreError::Corrupt { .. })));
}
