//! Enqueue service: the producer-facing entry point of the print queue

use std::sync::Arc;

use crab_printer::{PayloadEncoding, payload};
use http::HeaderValue;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{EnqueueRequest, JobStatus};
use thiserror::Error;

use super::store::{JobStore, StorageError};
use super::types::JobMetadata;

/// Content type used when the producer does not name one
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Failed to store print job for {printer_id}: {source}")]
    Storage {
        printer_id: String,
        #[source]
        source: StorageError,
    },
}

impl From<EnqueueError> for AppError {
    fn from(err: EnqueueError) -> Self {
        match err {
            EnqueueError::MissingField { field } => AppError::required_field(field),
            EnqueueError::InvalidField { field: "payload", reason } => {
                AppError::with_message(ErrorCode::PrintPayloadInvalid, format!("payload: {reason}"))
                    .with_detail("field", "payload")
            }
            EnqueueError::InvalidField { field, reason } => {
                AppError::validation(format!("{field}: {reason}")).with_detail("field", field)
            }
            EnqueueError::Storage { printer_id, source } => {
                tracing::error!(
                    printer_id = %printer_id,
                    error = %source,
                    "Failed to enqueue print job"
                );
                let mut app = AppError::database(source.to_string())
                    .with_detail("operation", "enqueue")
                    .with_detail("printer_id", printer_id)
                    .with_detail("hint", source.hint());
                if let Some(code) = source.code() {
                    app = app.with_detail("storage_code", code);
                }
                app
            }
        }
    }
}

/// Validated print request, payload still raw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintRequest {
    pub printer_id: String,
    pub payload: Vec<u8>,
    pub content_type: String,
    pub order_reference: Option<String>,
    pub receipt_kind: Option<String>,
}

impl PrintRequest {
    pub fn new(printer_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            printer_id: printer_id.into(),
            payload,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            order_reference: None,
            receipt_kind: None,
        }
    }

    /// Validate an enqueue body from the wire
    pub fn from_wire(req: EnqueueRequest) -> Result<Self, EnqueueError> {
        let printer_id = require_printer_id(req.printer_id)?;

        let payload = match req.payload {
            None | Some(Value::Null) => {
                return Err(EnqueueError::MissingField { field: "payload" });
            }
            Some(Value::String(s)) => s.into_bytes(),
            Some(_) => {
                return Err(EnqueueError::InvalidField {
                    field: "payload",
                    reason: "must be a string".into(),
                });
            }
        };

        let content_type = match req.content_type.map(|c| c.trim().to_string()) {
            Some(c) if !c.is_empty() => {
                if HeaderValue::from_str(&c).is_err() {
                    return Err(EnqueueError::InvalidField {
                        field: "content_type",
                        reason: "not a valid media type".into(),
                    });
                }
                c
            }
            _ => DEFAULT_CONTENT_TYPE.to_string(),
        };

        Ok(Self {
            printer_id,
            payload,
            content_type,
            order_reference: non_empty(req.order_reference),
            receipt_kind: non_empty(req.receipt_kind),
        })
    }
}

/// `printer_id` must be present and non-blank
pub fn require_printer_id(printer_id: Option<String>) -> Result<String, EnqueueError> {
    match printer_id.map(|p| p.trim().to_string()) {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(EnqueueError::MissingField { field: "printer_id" }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Outcome of a successful enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueuedJob {
    pub job_id: String,
    pub printer_id: String,
    pub status: JobStatus,
    pub encoding: PayloadEncoding,
}

#[derive(Clone)]
pub struct EnqueueService {
    store: Arc<dyn JobStore>,
}

impl EnqueueService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Encode the payload if needed and write a QUEUED job
    pub async fn enqueue(&self, req: PrintRequest) -> Result<EnqueuedJob, EnqueueError> {
        let size = req.payload.len();
        let (stored, encoding) = payload::encode(req.payload);

        let metadata = JobMetadata {
            encoding,
            order_reference: req.order_reference,
            receipt_kind: req.receipt_kind,
        };

        let job_id = self
            .store
            .enqueue(&req.printer_id, stored, &req.content_type, metadata)
            .await
            .map_err(|source| EnqueueError::Storage {
                printer_id: req.printer_id.clone(),
                source,
            })?;

        tracing::info!(
            job_id = %job_id,
            printer_id = %req.printer_id,
            content_type = %req.content_type,
            encoding = %encoding,
            bytes = size,
            "job enqueued"
        );

        Ok(EnqueuedJob {
            job_id,
            printer_id: req.printer_id,
            status: JobStatus::Queued,
            encoding,
        })
    }
}
