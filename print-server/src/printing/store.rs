//! Job store: durable per-printer queue of print jobs
//!
//! Handlers depend on the [`JobStore`] trait only. [`SqliteJobStore`] is the
//! production backend; [`MemoryJobStore`](super::MemoryJobStore) backs tests
//! and the `PRINT_STORE=memory` mode.

use async_trait::async_trait;
use crab_printer::PayloadEncoding;
use shared::models::JobStatus;
use shared::util::now_millis;
use sqlx::SqlitePool;
use thiserror::Error;

use super::types::{JobMetadata, MarkOutcome, PrintJob, StatusCount};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StorageError {
    /// Error code reported by the database itself, if any
    pub fn code(&self) -> Option<String> {
        match self {
            StorageError::Database(sqlx::Error::Database(e)) => e.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    /// Short operator-facing hint
    pub fn hint(&self) -> &'static str {
        use sqlx::error::ErrorKind;

        match self {
            StorageError::Database(sqlx::Error::Database(e)) => match e.kind() {
                ErrorKind::UniqueViolation => "a job with this id already exists",
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    "row rejected by a schema constraint"
                }
                _ => "database rejected the statement",
            },
            StorageError::Database(sqlx::Error::PoolTimedOut) => {
                "database is busy, the request can be retried"
            }
            StorageError::Database(sqlx::Error::Io(_)) => "database file is not reachable",
            StorageError::Database(_) => "database unavailable",
            StorageError::Migration(_) => "schema migration failed, check WORK_DIR permissions",
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Ordered per-printer queue of print jobs
///
/// Jobs of one printer are served in insertion order. `created_at` is
/// informational and never decides the order, so a wall clock stepping back
/// cannot reorder a queue. Implementations must be safe under concurrent callers without a
/// higher-level lock.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a QUEUED job atomically and return its id
    async fn enqueue(
        &self,
        printer_id: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: JobMetadata,
    ) -> StorageResult<String>;

    /// Oldest QUEUED job of a printer, without touching its state
    async fn peek_oldest_queued(&self, printer_id: &str) -> StorageResult<Option<PrintJob>>;

    /// Conditional QUEUED → DELIVERED transition; exactly one concurrent caller wins
    async fn mark_delivered(&self, job_id: &str) -> StorageResult<MarkOutcome>;

    /// Newest-first listing, optionally for one printer
    async fn list_recent(&self, printer_id: Option<&str>, limit: u32)
    -> StorageResult<Vec<PrintJob>>;

    /// Job counts per printer and status for jobs created at or after `since` (ms),
    /// ordered by printer id and then by status text
    async fn status_counts(&self, since: i64) -> StorageResult<Vec<StatusCount>>;
}

/// New job id (UUID v4)
pub(crate) fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

const JOB_COLUMNS: &str = "id, printer_id, payload, content_type, status, encoding, order_reference, receipt_kind, created_at, delivered_at";

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    printer_id: String,
    payload: Vec<u8>,
    content_type: String,
    status: JobStatus,
    encoding: String,
    order_reference: Option<String>,
    receipt_kind: Option<String>,
    created_at: i64,
    delivered_at: Option<i64>,
}

impl From<JobRow> for PrintJob {
    /// An unknown encoding marker is served as unencoded stored bytes
    fn from(row: JobRow) -> Self {
        let encoding = row.encoding.parse::<PayloadEncoding>().unwrap_or_else(|e| {
            tracing::warn!(
                job_id = %row.id,
                printer_id = %row.printer_id,
                marker = %row.encoding,
                error = %e,
                "payload decode failed, unknown encoding marker"
            );
            PayloadEncoding::Unencoded
        });

        PrintJob {
            id: row.id,
            printer_id: row.printer_id,
            payload: row.payload,
            content_type: row.content_type,
            status: row.status,
            encoding,
            order_reference: row.order_reference,
            receipt_kind: row.receipt_kind,
            created_at: row.created_at,
            delivered_at: row.delivered_at,
        }
    }
}

/// SQLite-backed job store
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn enqueue(
        &self,
        printer_id: &str,
        payload: Vec<u8>,
        content_type: &str,
        metadata: JobMetadata,
    ) -> StorageResult<String> {
        let id = new_job_id();

        sqlx::query(
            "INSERT INTO print_jobs (id, printer_id, payload, content_type, status, encoding, order_reference, receipt_kind, created_at) VALUES (?, ?, ?, ?, 'QUEUED', ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(printer_id)
        .bind(payload)
        .bind(content_type)
        .bind(metadata.encoding.as_str())
        .bind(metadata.order_reference)
        .bind(metadata.receipt_kind)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn peek_oldest_queued(&self, printer_id: &str) -> StorageResult<Option<PrintJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE printer_id = ? AND status = 'QUEUED' ORDER BY rowid ASC LIMIT 1"
        ))
        .bind(printer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PrintJob::from))
    }

    async fn mark_delivered(&self, job_id: &str) -> StorageResult<MarkOutcome> {
        let result = sqlx::query(
            "UPDATE print_jobs SET status = 'DELIVERED', delivered_at = ? WHERE id = ? AND status = 'QUEUED'",
        )
        .bind(now_millis())
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(MarkOutcome::Delivered);
        }

        // Lost the conditional update: tell "already delivered" from "never existed"
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM print_jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match exists {
            Some(_) => MarkOutcome::AlreadyDelivered,
            None => MarkOutcome::NotFound,
        })
    }

    async fn list_recent(
        &self,
        printer_id: Option<&str>,
        limit: u32,
    ) -> StorageResult<Vec<PrintJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs WHERE (?1 IS NULL OR printer_id = ?1) ORDER BY rowid DESC LIMIT ?2"
        ))
        .bind(printer_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PrintJob::from).collect())
    }

    async fn status_counts(&self, since: i64) -> StorageResult<Vec<StatusCount>> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT printer_id, status, COUNT(*) AS count FROM print_jobs WHERE created_at >= ? GROUP BY printer_id, status ORDER BY printer_id, status",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_store() -> SqliteJobStore {
        let db = DbService::in_memory().await.unwrap();
        SqliteJobStore::new(db.pool)
    }

    fn plain() -> JobMetadata {
        JobMetadata::default()
    }

    #[tokio::test]
    async fn test_enqueue_then_peek() {
        let store = test_store().await;
        let id = store
            .enqueue(
                "p1",
                b"hello".to_vec(),
                "text/plain",
                JobMetadata {
                    encoding: PayloadEncoding::Unencoded,
                    order_reference: Some("order-7".into()),
                    receipt_kind: None,
                },
            )
            .await
            .unwrap();

        let job = store.peek_oldest_queued("p1").await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.payload, b"hello");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.order_reference.as_deref(), Some("order-7"));
        assert!(job.delivered_at.is_none());

        // Peeking does not consume
        let again = store.peek_oldest_queued("p1").await.unwrap().unwrap();
        assert_eq!(again.id, id);
    }

    #[tokio::test]
    async fn test_peek_is_oldest_first_per_printer() {
        let store = test_store().await;
        let first = store.enqueue("p1", b"1".to_vec(), "text/plain", plain()).await.unwrap();
        let _other = store.enqueue("p2", b"x".to_vec(), "text/plain", plain()).await.unwrap();
        let second = store.enqueue("p1", b"2".to_vec(), "text/plain", plain()).await.unwrap();

        assert_eq!(store.peek_oldest_queued("p1").await.unwrap().unwrap().id, first);
        assert_eq!(store.mark_delivered(&first).await.unwrap(), MarkOutcome::Delivered);
        assert_eq!(store.peek_oldest_queued("p1").await.unwrap().unwrap().id, second);
        assert!(store.peek_oldest_queued("p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_delivered_is_idempotent() {
        let store = test_store().await;
        let id = store.enqueue("p1", b"x".to_vec(), "text/plain", plain()).await.unwrap();

        assert_eq!(store.mark_delivered(&id).await.unwrap(), MarkOutcome::Delivered);
        assert_eq!(store.mark_delivered(&id).await.unwrap(), MarkOutcome::AlreadyDelivered);
        assert_eq!(store.mark_delivered("missing").await.unwrap(), MarkOutcome::NotFound);

        assert!(store.peek_oldest_queued("p1").await.unwrap().is_none());
        let listed = store.list_recent(Some("p1"), 10).await.unwrap();
        assert_eq!(listed[0].status, JobStatus::Delivered);
        assert!(listed[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_encoded_payload_round_trips_marker() {
        let store = test_store().await;
        let (stored, marker) = crab_printer::payload::encode(b"\x1B@\x1DV\x01".to_vec());
        store
            .enqueue(
                "p1",
                stored.clone(),
                "application/vnd.star.starprnt",
                JobMetadata {
                    encoding: marker,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let job = store.peek_oldest_queued("p1").await.unwrap().unwrap();
        assert_eq!(job.encoding, PayloadEncoding::Base64);
        assert_eq!(job.payload, stored);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_with_filter() {
        let store = test_store().await;
        let a = store.enqueue("p1", b"a".to_vec(), "text/plain", plain()).await.unwrap();
        let b = store.enqueue("p2", b"b".to_vec(), "text/plain", plain()).await.unwrap();
        let c = store.enqueue("p1", b"c".to_vec(), "text/plain", plain()).await.unwrap();

        let all: Vec<String> = store
            .list_recent(None, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(all, vec![c.clone(), b, a.clone()]);

        let p1: Vec<String> = store
            .list_recent(Some("p1"), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(p1, vec![c.clone(), a]);

        let limited = store.list_recent(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, c);
    }

    #[tokio::test]
    async fn test_status_counts() {
        let store = test_store().await;
        let a = store.enqueue("p1", b"a".to_vec(), "text/plain", plain()).await.unwrap();
        store.enqueue("p1", b"b".to_vec(), "text/plain", plain()).await.unwrap();
        store.enqueue("p2", b"c".to_vec(), "text/plain", plain()).await.unwrap();
        store.mark_delivered(&a).await.unwrap();

        let counts = store.status_counts(0).await.unwrap();
        assert_eq!(
            counts,
            vec![
                StatusCount { printer_id: "p1".into(), status: JobStatus::Delivered, count: 1 },
                StatusCount { printer_id: "p1".into(), status: JobStatus::Queued, count: 1 },
                StatusCount { printer_id: "p2".into(), status: JobStatus::Queued, count: 1 },
            ]
        );

        let future = now_millis() + 60_000;
        assert!(store.status_counts(future).await.unwrap().is_empty());
    }

    async fn insert_raw(store: &SqliteJobStore, id: &str, payload: &[u8], encoding: &str, created_at: i64) {
        sqlx::query(
            "INSERT INTO print_jobs (id, printer_id, payload, content_type, status, encoding, created_at) VALUES (?, 'p1', ?, 'text/plain', 'QUEUED', ?, ?)",
        )
        .bind(id)
        .bind(payload)
        .bind(encoding)
        .bind(created_at)
        .execute(&store.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_marker_does_not_block_queue() {
        let store = test_store().await;
        insert_raw(&store, "bad", b"H4sI", "gzip", 1).await;
        let good = store.enqueue("p1", b"good".to_vec(), "text/plain", plain()).await.unwrap();

        let job = store.peek_oldest_queued("p1").await.unwrap().unwrap();
        assert_eq!(job.id, "bad");
        assert_eq!(job.encoding, PayloadEncoding::Unencoded);
        assert_eq!(store.list_recent(Some("p1"), 10).await.unwrap().len(), 2);

        let poll = crate::printing::PollHandler::new(std::sync::Arc::new(store.clone()));
        let mut served = Vec::new();
        while let crate::printing::FetchOutcome::Content(job) = poll.fetch("p1", None, None).await.unwrap() {
            served.push((job.job_id, job.body));
        }
        assert_eq!(
            served,
            vec![("bad".to_string(), b"H4sI".to_vec()), (good, b"good".to_vec())]
        );
    }

    #[tokio::test]
    async fn test_queue_order_ignores_wall_clock() {
        let store = test_store().await;
        // Written first, stamped an hour ahead: a clock that later steps back
        insert_raw(&store, "early", b"1", "unencoded", now_millis() + 3_600_000).await;
        let later = store.enqueue("p1", b"2".to_vec(), "text/plain", plain()).await.unwrap();

        assert_eq!(store.peek_oldest_queued("p1").await.unwrap().unwrap().id, "early");
        store.mark_delivered("early").await.unwrap();
        assert_eq!(store.peek_oldest_queued("p1").await.unwrap().unwrap().id, later);

        let newest_first: Vec<String> = store
            .list_recent(Some("p1"), 10)
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(newest_first, vec![later, "early".to_string()]);
    }

    #[tokio::test]
    async fn test_status_counts_match_memory_store_order() {
        let sqlite = test_store().await;
        let memory = crate::printing::MemoryJobStore::new();

        for store in [&sqlite as &dyn JobStore, &memory as &dyn JobStore] {
            let a = store.enqueue("p2", b"a".to_vec(), "text/plain", plain()).await.unwrap();
            store.enqueue("p1", b"b".to_vec(), "text/plain", plain()).await.unwrap();
            store.enqueue("p2", b"c".to_vec(), "text/plain", plain()).await.unwrap();
            store.mark_delivered(&a).await.unwrap();
        }

        assert_eq!(
            sqlite.status_counts(0).await.unwrap(),
            memory.status_counts(0).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_check_constraint_reports_code() {
        let store = test_store().await;
        let err = sqlx::query(
            "INSERT INTO print_jobs (id, printer_id, payload, content_type, status, encoding, created_at) VALUES ('x', 'p1', x'00', 'text/plain', 'PRINTED', 'unencoded', 1)",
        )
        .execute(&store.pool)
        .await
        .map_err(StorageError::from)
        .unwrap_err();

        assert!(err.code().is_some());
        assert_ne!(err.hint(), "database unavailable");
    }
}
