use super::*;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use tvresearch_pipeline::{
    CapabilitySet, MemoryRecordStore, PipelineContext, PipelineSettings,
};

fn create_test_router() -> Router {
    let context = PipelineContext::with_store(
        PipelineSettings::default(),
        Arc::new(MemoryRecordStore::new()),
        CapabilitySet::new(),
    );
    create_router(Arc::new(AppState::new(context.service())))
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_research(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/research")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = create_test_router();
    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_research() {
    let app = create_test_router();
    let response = app
        .oneshot(post_research(serde_json::json!({"topic": "AI in healthcare"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["topic"], "AI in healthcare");
    assert_eq!(body["status"], "queued");
    assert_eq!(body["progress"]["state"], "queued");
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_create_research_without_topic() {
    let app = create_test_router();
    let response = app.oneshot(post_research(serde_json::json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["topic"].is_null());
}

#[tokio::test]
async fn test_get_and_delete_research() {
    let app = create_test_router();
    let created = json_body(
        app.clone()
            .oneshot(post_research(serde_json::json!({"topic": "fusion"})))
            .await
            .unwrap(),
    )
    .await;
    let uri = format!("/research/{}", created["id"]);

    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["topic"], "fusion");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "Research result deleted successfully"
    );

    let response = app.oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Research result not found");
}

#[tokio::test]
async fn test_delete_missing_research() {
    let app = create_test_router();
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/research/999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_research_paging() {
    let app = create_test_router();
    for topic in ["a", "b", "c"] {
        app.clone()
            .oneshot(post_research(serde_json::json!({"topic": topic})))
            .await
            .unwrap();
    }

    let body = json_body(app.clone().oneshot(get("/research")).await.unwrap()).await;
    let topics: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["topic"].as_str().unwrap())
        .collect();
    assert_eq!(topics, vec!["c", "b", "a"]);

    let body = json_body(
        app.clone()
            .oneshot(get("/research?limit=1&offset=1"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["topic"], "b");

    let response = app.oneshot(get("/research?limit=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_queue_status() {
    let app = create_test_router();
    app.clone()
        .oneshot(post_research(serde_json::json!({})))
        .await
        .unwrap();

    let response = app.oneshot(get("/queue/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["queues"]["trend_research"], 1);
    assert_eq!(body["queues"]["news_aggregation"], 0);
    assert_eq!(body["queues"]["content_strategy"], 0);
    assert_eq!(body["queues"]["final_reporting"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_metrics() {
    let app = create_test_router();
    app.clone()
        .oneshot(post_research(serde_json::json!({"topic": "x"})))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["research_stats"]["total"], 1);
    assert_eq!(body["research_stats"]["active"], 1);
    assert_eq!(body["recent_activity"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_id_is_rejected() {
    let app = create_test_router();
    let response = app.oneshot(get("/research/not-a-number")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
