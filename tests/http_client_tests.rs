//! HttpRemoteClient against a local stand-in remote service

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use katello_tasks::client::{
    HttpRemoteClient, RemoteAction, RemoteActionClient, RemoteError, RemoteJobState, RemoteService,
};
use serde_json::{json, Value};
use std::time::Duration;

async fn dispatch(Path(action): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    match action.as_str() {
        "repository.sync" => (
            StatusCode::ACCEPTED,
            Json(json!({
                "correlation_id": format!("job-{}", body["target"].as_str().unwrap_or("")),
                "status": "running"
            })),
        )
            .into_response(),
        "bogus" => (StatusCode::UNPROCESSABLE_ENTITY, "unknown action").into_response(),
        "garbled" => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn job(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "done" => Json(json!({"state": "finished", "result": {"added": 3}})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({"state": "running"})).into_response()
        }
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "teapot" => StatusCode::IM_A_TEAPOT.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_remote() -> String {
    let app = Router::new()
        .route("/pulp/api/actions/{action}", post(dispatch))
        .route("/pulp/api/jobs/{id}", get(job));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/pulp/api/")
}

fn client(base: &str) -> HttpRemoteClient {
    HttpRemoteClient::new(RemoteService::ContentSync, base, Duration::from_millis(500)).unwrap()
}

#[tokio::test]
async fn test_dispatch_outcomes() {
    let base = spawn_remote().await;
    let client = client(&base);

    let handle = client
        .dispatch(&RemoteAction::new("repository.sync", "zoo_el9", json!({"feed_url": "http://x"})))
        .await
        .unwrap();
    assert_eq!(handle.correlation_id, "job-zoo_el9");
    assert_eq!(handle.initial_status, RemoteJobState::Running);

    let err = client
        .dispatch(&RemoteAction::new("bogus", "zoo", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Rejected { .. }));
    assert!(err.to_string().contains("unknown action"));

    let err = client
        .dispatch(&RemoteAction::new("overloaded", "zoo", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unavailable { .. }));

    let err = client
        .dispatch(&RemoteAction::new("garbled", "zoo", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Protocol { .. }));
}

#[tokio::test]
async fn test_query_outcomes() {
    let base = spawn_remote().await;
    let client = client(&base);

    let status = client.query("done").await.unwrap();
    assert_eq!(status.state, RemoteJobState::Finished);
    assert_eq!(status.result, Some(json!({"added": 3})));

    assert!(matches!(client.query("missing").await, Err(RemoteError::NotFound { .. })));
    assert!(matches!(client.query("broken").await, Err(RemoteError::Unavailable { .. })));
    assert!(matches!(client.query("teapot").await, Err(RemoteError::Protocol { .. })));
    assert!(matches!(client.query("slow").await, Err(RemoteError::Timeout { .. })));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Bind and drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}/"));
    let err = client
        .dispatch(&RemoteAction::new("repository.sync", "zoo", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unavailable { .. }));
    assert!(err.is_transient());
}
