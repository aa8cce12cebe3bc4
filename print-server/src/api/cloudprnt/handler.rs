//! CloudPRNT API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;

use crate::core::ServerState;
use crate::printing::FetchOutcome;
use crate::utils::{AppError, AppResult};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Printers must never see a cached answer
fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers
}

/// POST /printers/{printer_id}/job - phase A, is a job ready?
///
/// The status body is opaque; anything that is not JSON is logged as null.
pub async fn check_availability(
    State(state): State<ServerState>,
    Path(printer_id): Path<String>,
    body: Bytes,
) -> Response {
    let status: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let ready = state
        .poll_handler()
        .check_availability(&printer_id, &status)
        .await;

    (no_cache_headers(), Json(ready)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub device: Option<String>,
}

/// GET /printers/{printer_id}/job?type=&device= - phase B, hand over the job
pub async fn fetch(
    State(state): State<ServerState>,
    Path(printer_id): Path<String>,
    Query(query): Query<FetchQuery>,
) -> AppResult<Response> {
    let outcome = state
        .poll_handler()
        .fetch(
            &printer_id,
            query.media_type.as_deref(),
            query.device.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                printer_id = %printer_id,
                operation = "fetch",
                error = %e,
                "job fetch failed"
            );
            AppError::database(e.to_string())
                .with_detail("operation", "fetch")
                .with_detail("printer_id", printer_id.clone())
                .with_detail("hint", e.hint())
        })?;

    let mut headers = no_cache_headers();
    match outcome {
        FetchOutcome::NoContent => Ok((StatusCode::NO_CONTENT, headers).into_response()),
        FetchOutcome::Content(job) => {
            let content_type = HeaderValue::from_str(&job.content_type)
                .unwrap_or(HeaderValue::from_static(FALLBACK_CONTENT_TYPE));
            headers.insert(header::CONTENT_TYPE, content_type);
            Ok((StatusCode::OK, headers, job.body).into_response())
        }
    }
}
