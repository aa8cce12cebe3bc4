//! Print Job Models
//!
//! Wire types of the print dispatch endpoints. The printer-facing types use
//! camelCase field names because printer firmware expects them verbatim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Print job lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum JobStatus {
    /// Waiting for the printer to fetch it
    Queued,
    /// Handed to the printer (terminal)
    Delivered,
}

impl JobStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Delivered => "DELIVERED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown job status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownJobStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownJobStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "DELIVERED" => Ok(JobStatus::Delivered),
            other => Err(UnknownJobStatus(other.to_string())),
        }
    }
}

/// Enqueue request body (`POST /print-jobs`)
///
/// Every field is optional at the serde level so that missing values are
/// reported as validation errors instead of body rejections. `payload` stays a
/// raw JSON value to tell "missing" apart from "not a string".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub printer_id: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub content_type: Option<String>,
    pub order_reference: Option<String>,
    pub receipt_kind: Option<String>,
}

/// Enqueue response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub success: bool,
    pub job_id: String,
    pub printer_id: String,
    pub status: JobStatus,
}

/// Phase A response (`POST /printers/{id}/job`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReadyResponse {
    pub job_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_token: Option<String>,
}

impl JobReadyResponse {
    pub fn not_ready() -> Self {
        Self {
            job_ready: false,
            media_types: None,
            job_token: None,
        }
    }

    pub fn ready(content_type: impl Into<String>, job_token: impl Into<String>) -> Self {
        Self {
            job_ready: true,
            media_types: Some(vec![content_type.into()]),
            job_token: Some(job_token.into()),
        }
    }
}

/// Print job without its payload (inspection listing)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PrintJobSummary {
    pub id: String,
    pub printer_id: String,
    pub content_type: String,
    pub status: JobStatus,
    /// Payload encoding marker: "unencoded" | "base64"
    pub encoding: String,
    pub order_reference: Option<String>,
    /// "kitchen" | "customer" for composed receipts
    pub receipt_kind: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
    /// Stored payload size in bytes
    pub payload_bytes: i64,
}

/// Counts per status
pub type StatusCounts = BTreeMap<JobStatus, u64>;

/// Aggregates over the inspection window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    pub window_secs: u64,
    pub by_status: StatusCounts,
    pub by_printer: BTreeMap<String, StatusCounts>,
}

/// Inspection response (`GET /print-jobs`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJobListResponse {
    pub jobs: Vec<PrintJobSummary>,
    pub stats: QueueStats,
}
