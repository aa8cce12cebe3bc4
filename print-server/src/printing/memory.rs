//! In-memory job store

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::models::JobStatus;
use shared::util::now_millis;
use tokio::sync::Mutex;

use super::store::{JobStore, StorageResult, new_job_id};
use super::types::{JobMetadata, MarkOutcome, PrintJob, StatusCount};

/// Job store kept in process memory
///
/// Jobs live in insertion order, which is also queue order, as rowid order is
/// for the SQLite store. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<PrintJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(
        &self,
        printer_id: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: JobMetadata,
    ) -> StorageResult<String> {
        let id = new_job_id();
        let job = PrintJob {
            id: id.clone(),
            printer_id: printer_id.to_string(),
            payload,
            content_type: content_type.to_string(),
            status: JobStatus::Queued,
            encoding: metadata.encoding,
            order_reference: metadata.order_reference,
            receipt_kind: metadata.receipt_kind,
            created_at: now_millis(),
            delivered_at: None,
        };

        self.jobs.lock().await.push(job);
        Ok(id)
    }

    async fn peek_oldest_queued(&self, printer_id: &str) -> StorageResult<Option<PrintJob>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .find(|j| j.printer_id == printer_id && j.status == JobStatus::Queued)
            .cloned())
    }

    async fn mark_delivered(&self, job_id: &str) -> StorageResult<MarkOutcome> {
        let mut jobs = self.jobs.lock().await;
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(MarkOutcome::NotFound);
        };

        if job.status != JobStatus::Queued {
            return Ok(MarkOutcome::AlreadyDelivered);
        }

        job.status = JobStatus::Delivered;
        job.delivered_at = Some(now_millis());
        Ok(MarkOutcome::Delivered)
    }

    async fn list_recent(
        &self,
        printer_id: Option<&str>,
        limit: u32,
    ) -> StorageResult<Vec<PrintJob>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .rev()
            .filter(|j| printer_id.is_none_or(|p| j.printer_id == p))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn status_counts(&self, since: i64) -> StorageResult<Vec<StatusCount>> {
        let jobs = self.jobs.lock().await;
        // Keyed by status text so rows come out in the same order as SQL's ORDER BY
        let mut counts: BTreeMap<(String, &'static str), (JobStatus, i64)> = BTreeMap::new();

        for job in jobs.iter().filter(|j| j.created_at >= since) {
            counts
                .entry((job.printer_id.clone(), job.status.as_str()))
                .or_insert((job.status, 0))
                .1 += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((printer_id, _), (status, count))| StatusCount {
                printer_id,
                status,
                count,
            })
            .collect())
    }
}
