#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Request, Response, header};
use http_body_util::BodyExt;
use print_server::db::DbService;
use print_server::printing::{
    CategoryOrderingTable, JobMetadata, JobStore, MarkOutcome, MemoryJobStore, PrintJob,
    SqliteJobStore, StatusCount, StorageError, StorageResult,
};
use print_server::{Config, ServerState, build_app};
use tower::ServiceExt;

pub fn test_config() -> Config {
    Config::from_lookup(|_| None)
}

pub fn memory_app_with(config: Config, ordering: CategoryOrderingTable) -> Router {
    build_app(ServerState::with_store(
        config,
        Arc::new(MemoryJobStore::new()),
        ordering,
    ))
}

pub fn memory_app() -> Router {
    memory_app_with(test_config(), CategoryOrderingTable::new())
}

pub async fn sqlite_app() -> Router {
    let db = DbService::in_memory().await.unwrap();
    build_app(ServerState::with_store(
        test_config(),
        Arc::new(SqliteJobStore::new(db.pool)),
        CategoryOrderingTable::new(),
    ))
}

/// Store whose every call fails with a busy pool
pub struct UnavailableStore;

fn busy() -> StorageError {
    StorageError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl JobStore for UnavailableStore {
    async fn enqueue(&self, _: &str, _: Vec<u8>, _: &str, _: JobMetadata) -> StorageResult<String> {
        Err(busy())
    }

    async fn peek_oldest_queued(&self, _: &str) -> StorageResult<Option<PrintJob>> {
        Err(busy())
    }

    async fn mark_delivered(&self, _: &str) -> StorageResult<MarkOutcome> {
        Err(busy())
    }

    async fn list_recent(&self, _: Option<&str>, _: u32) -> StorageResult<Vec<PrintJob>> {
        Err(busy())
    }

    async fn status_counts(&self, _: i64) -> StorageResult<Vec<StatusCount>> {
        Err(busy())
    }
}

pub fn unavailable_app() -> Router {
    build_app(ServerState::with_store(
        test_config(),
        Arc::new(UnavailableStore),
        CategoryOrderingTable::new(),
    ))
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Queue a text job and return its id
pub async fn enqueue_text(app: &Router, printer_id: &str, text: &str) -> String {
    let response = post_json(
        app,
        "/print-jobs",
        serde_json::json!({ "printer_id": printer_id, "payload": text }),
    )
    .await;
    assert_eq!(response.status(), 200);
    body_json(response).await["jobId"]
        .as_str()
        .unwrap()
        .to_string()
}
