//! CloudPRNT-style poll handler
//!
//! Printers drive a two-phase pull:
//! - Phase A (`POST`): "is there a job for me?" answered from a read-only peek
//! - Phase B (`GET`): "give me the job" which marks the job delivered and
//!   hands over the decoded bytes
//!
//! No state is kept between the two phases; everything lives in the job store.

use std::sync::Arc;

use crab_printer::payload;
use serde_json::Value;
use shared::models::JobReadyResponse;

use super::store::{JobStore, StorageResult};
use super::types::MarkOutcome;

/// Peek/mark rounds a Phase B request makes before answering "no content"
pub const MAX_FETCH_ATTEMPTS: usize = 3;

/// Job content handed to the printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredJob {
    pub job_id: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Nothing queued (HTTP 204)
    NoContent,
    Content(DeliveredJob),
}

#[derive(Clone)]
pub struct PollHandler {
    store: Arc<dyn JobStore>,
}

impl PollHandler {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Phase A: availability check
    ///
    /// Never mutates job state. Storage failures answer "not ready" so the
    /// printer simply polls again.
    pub async fn check_availability(&self, printer_id: &str, status: &Value) -> JobReadyResponse {
        if !status.is_null() {
            tracing::debug!(printer_id = %printer_id, status = %status, "printer status report");
        }

        match self.store.peek_oldest_queued(printer_id).await {
            Ok(Some(job)) => {
                tracing::info!(
                    job_id = %job.id,
                    printer_id = %printer_id,
                    content_type = %job.content_type,
                    "availability hit"
                );
                JobReadyResponse::ready(job.content_type, job.id)
            }
            Ok(None) => {
                tracing::debug!(printer_id = %printer_id, "availability miss");
                JobReadyResponse::not_ready()
            }
            Err(e) => {
                tracing::warn!(
                    printer_id = %printer_id,
                    operation = "peek_oldest_queued",
                    hint = e.hint(),
                    error = %e,
                    "availability check failed, reporting no job"
                );
                JobReadyResponse::not_ready()
            }
        }
    }

    /// Phase B: content fetch
    ///
    /// The job is marked delivered before its bytes are returned. A storage
    /// failure is returned as an error and no content is handed out. A caller
    /// that loses the delivery race to a concurrent fetch re-peeks, so it can
    /// only ever receive the next job in order or nothing.
    pub async fn fetch(
        &self,
        printer_id: &str,
        media_type: Option<&str>,
        device: Option<&str>,
    ) -> StorageResult<FetchOutcome> {
        for _ in 0..MAX_FETCH_ATTEMPTS {
            let Some(job) = self.store.peek_oldest_queued(printer_id).await? else {
                return Ok(FetchOutcome::NoContent);
            };

            let body = match payload::try_decode(&job.payload, job.encoding) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        printer_id = %printer_id,
                        encoding = %job.encoding,
                        error = %e,
                        "payload decode failed, delivering stored bytes"
                    );
                    job.payload.clone()
                }
            };

            match self.store.mark_delivered(&job.id).await? {
                MarkOutcome::Delivered => {
                    if let Some(requested) = media_type
                        && !requested.eq_ignore_ascii_case(&job.content_type)
                    {
                        tracing::warn!(
                            job_id = %job.id,
                            printer_id = %printer_id,
                            requested = %requested,
                            stored = %job.content_type,
                            "requested media type differs, delivering stored type"
                        );
                    }

                    tracing::info!(
                        job_id = %job.id,
                        printer_id = %printer_id,
                        device = device.unwrap_or("-"),
                        bytes = body.len(),
                        "job delivered"
                    );

                    return Ok(FetchOutcome::Content(DeliveredJob {
                        job_id: job.id,
                        content_type: job.content_type,
                        body,
                    }));
                }
                MarkOutcome::AlreadyDelivered => {
                    tracing::info!(job_id = %job.id, printer_id = %printer_id, "delivery lost race");
                }
                MarkOutcome::NotFound => {
                    tracing::warn!(
                        job_id = %job.id,
                        printer_id = %printer_id,
                        "job vanished between peek and delivery"
                    );
                }
            }
        }

        Ok(FetchOutcome::NoContent)
    }
}
