//! Print Job API Handlers

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use serde::Deserialize;
use shared::models::{EnqueueRequest, EnqueueResponse, PrintJobListResponse, QueueStats};
use shared::util::now_millis;

use crate::core::ServerState;
use crate::core::config::MAX_LIST_LIMIT;
use crate::printing::enqueue::require_printer_id;
use crate::printing::{
    ComposeRequest, EnqueueError, EnqueuedJob, PrintRequest, StatusCount, StorageError,
};
use crate::utils::{AppError, AppResult};

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    AppError::validation(rejection.body_text())
}

fn response(job: EnqueuedJob) -> Json<EnqueueResponse> {
    Json(EnqueueResponse {
        success: true,
        job_id: job.job_id,
        printer_id: job.printer_id,
        status: job.status,
    })
}

/// POST /print-jobs - queue a payload for a printer
pub async fn enqueue(
    State(state): State<ServerState>,
    body: Result<Json<EnqueueRequest>, JsonRejection>,
) -> AppResult<Json<EnqueueResponse>> {
    let Json(body) = body.map_err(rejection_to_error)?;
    let request = PrintRequest::from_wire(body)?;
    let job = state.enqueue_service().enqueue(request).await?;
    Ok(response(job))
}

/// POST /print-jobs/receipt - compose a receipt and queue it
pub async fn compose_receipt(
    State(state): State<ServerState>,
    body: Result<Json<ComposeRequest>, JsonRejection>,
) -> AppResult<Json<EnqueueResponse>> {
    let Json(body) = body.map_err(rejection_to_error)?;
    let printer_id = require_printer_id(body.printer_id)?;

    if let Some(line) = body.receipt.lines.iter().find(|l| l.quantity == 0) {
        return Err(EnqueueError::InvalidField {
            field: "quantity",
            reason: format!("{} has a zero quantity", line.name),
        }
        .into());
    }

    let bytes = state.renderer.render(&body.receipt);

    let mut request = PrintRequest::new(printer_id, bytes);
    request.content_type = state.config.command_media_type.clone();
    request.order_reference = body.order_reference.filter(|r| !r.trim().is_empty());
    request.receipt_kind = Some(body.receipt.audience.as_str().to_string());

    let job = state.enqueue_service().enqueue(request).await?;
    Ok(response(job))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub printer_id: Option<String>,
    pub limit: Option<u32>,
}

/// GET /print-jobs?printer_id=&limit= - recent jobs and queue aggregates
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PrintJobListResponse>> {
    let limit = query
        .limit
        .unwrap_or(state.config.list_limit)
        .clamp(1, MAX_LIST_LIMIT);
    let printer_id = query.printer_id.filter(|p| !p.trim().is_empty());

    let jobs = state
        .store
        .list_recent(printer_id.as_deref(), limit)
        .await
        .map_err(|e| storage_error("list_recent", e))?;

    let window_secs = state.config.stats_window_secs;
    let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    let counts = state
        .store
        .status_counts(now_millis().saturating_sub(window_ms))
        .await
        .map_err(|e| storage_error("status_counts", e))?;

    Ok(Json(PrintJobListResponse {
        jobs: jobs.iter().map(|j| j.summary()).collect(),
        stats: queue_stats(window_secs, counts),
    }))
}

fn storage_error(operation: &'static str, e: StorageError) -> AppError {
    tracing::error!(operation = operation, error = %e, "queue inspection failed");
    AppError::database(e.to_string())
        .with_detail("operation", operation)
        .with_detail("hint", e.hint())
}

/// Fold per-printer counts into the response aggregates
fn queue_stats(window_secs: u64, counts: Vec<StatusCount>) -> QueueStats {
    let mut stats = QueueStats {
        window_secs,
        ..Default::default()
    };

    for row in counts {
        let n = u64::try_from(row.count).unwrap_or(0);
        *stats.by_status.entry(row.status).or_default() += n;
        *stats
            .by_printer
            .entry(row.printer_id)
            .or_default()
            .entry(row.status)
            .or_default() += n;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::JobStatus;

    #[test]
    fn test_queue_stats_folds_rows() {
        let rows = vec![
            StatusCount {
                printer_id: "p1".into(),
                status: JobStatus::Queued,
                count: 2,
            },
            StatusCount {
                printer_id: "p1".into(),
                status: JobStatus::Delivered,
                count: 5,
            },
            StatusCount {
                printer_id: "p2".into(),
                status: JobStatus::Queued,
                count: 1,
            },
        ];

        let stats = queue_stats(60, rows);
        assert_eq!(stats.window_secs, 60);
        assert_eq!(stats.by_status[&JobStatus::Queued], 3);
        assert_eq!(stats.by_status[&JobStatus::Delivered], 5);
        assert_eq!(stats.by_printer["p1"][&JobStatus::Delivered], 5);
        assert_eq!(stats.by_printer["p2"].len(), 1);
    }
}
