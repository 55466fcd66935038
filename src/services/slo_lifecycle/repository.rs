//! SLO Lifecycle repository: the single abstraction through which the
//! active SLO and its audit log are read and written. Concurrency is
//! contained here — a memory-backed implementation for tests, a sqlx-backed
//! one for production — so callers never touch storage directly.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::models::{ActiveSlo, ActiveSloRow, SloAuditEntry, SloAuditEntryRow};
use crate::utils::ApiResult;

#[async_trait]
pub trait SloRepository: Send + Sync {
    async fn get_active(&self, service_id: &str) -> ApiResult<Option<ActiveSlo>>;

    /// Atomically replace the active SLO and append the audit entry for the
    /// same transition. Either both persist or neither does.
    async fn set_active_and_append(&self, active: ActiveSlo, audit_entry: SloAuditEntry) -> ApiResult<()>;

    /// Append an audit entry without changing the active SLO (used for the
    /// `reject` action).
    async fn append_only(&self, audit_entry: SloAuditEntry) -> ApiResult<()>;

    /// Full audit history for a service, newest first.
    async fn history(&self, service_id: &str) -> ApiResult<Vec<SloAuditEntry>>;
}

/// Sqlx-backed repository. A single writer lock per service name is
/// approximated here with a global mutex over the write path; reads never
/// block on it and observe a consistent snapshot via the pool.
pub struct SqlSloRepository {
    pool: sqlx::SqlitePool,
    write_lock: tokio::sync::Mutex<()>,
    insertion_seq: AtomicI64,
}

impl SqlSloRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool, write_lock: tokio::sync::Mutex::new(()), insertion_seq: AtomicI64::new(0) }
    }

    async fn next_insertion_seq(&self) -> ApiResult<i64> {
        if self.insertion_seq.load(Ordering::Relaxed) == 0 {
            let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(insertion_seq) FROM slo_audit_log")
                .fetch_one(&self.pool)
                .await?;
            self.insertion_seq.store(row.0.unwrap_or(0), Ordering::Relaxed);
        }
        Ok(self.insertion_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    async fn insert_audit_entry(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entry: &SloAuditEntry,
        insertion_seq: i64,
    ) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO slo_audit_log (id, insertion_seq, service_id, action, actor, timestamp, \
             recommendation_id, previous_slo, new_slo, selected_tier, rationale, modification_delta) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(insertion_seq)
        .bind(&entry.service_id)
        .bind(entry.action.as_str())
        .bind(&entry.actor)
        .bind(entry.timestamp)
        .bind(entry.recommendation_id.map(|id| id.to_string()))
        .bind(entry.previous_slo.as_ref().map(serde_json::to_string).transpose()?)
        .bind(entry.new_slo.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&entry.selected_tier)
        .bind(&entry.rationale)
        .bind(entry.modification_delta.as_ref().map(serde_json::to_string).transpose()?)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SloRepository for SqlSloRepository {
    async fn get_active(&self, service_id: &str) -> ApiResult<Option<ActiveSlo>> {
        let row: Option<ActiveSloRow> = sqlx::query_as("SELECT * FROM active_slos WHERE service_id = ?")
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.into_active_slo()))
    }

    async fn set_active_and_append(&self, active: ActiveSlo, audit_entry: SloAuditEntry) -> ApiResult<()> {
        let _guard = self.write_lock.lock().await;
        let seq = self.next_insertion_seq().await?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO active_slos (id, service_id, availability_target, latency_p95_target_ms, \
             latency_p99_target_ms, source, selected_tier, recommendation_id, activated_at, activated_by) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(service_id) DO UPDATE SET \
             id = excluded.id, availability_target = excluded.availability_target, \
             latency_p95_target_ms = excluded.latency_p95_target_ms, \
             latency_p99_target_ms = excluded.latency_p99_target_ms, source = excluded.source, \
             selected_tier = excluded.selected_tier, recommendation_id = excluded.recommendation_id, \
             activated_at = excluded.activated_at, activated_by = excluded.activated_by",
        )
        .bind(active.id.to_string())
        .bind(&active.service_id)
        .bind(active.availability_target)
        .bind(active.latency_p95_target_ms)
        .bind(active.latency_p99_target_ms)
        .bind(active.source.as_str())
        .bind(&active.selected_tier)
        .bind(active.recommendation_id.map(|id| id.to_string()))
        .bind(active.activated_at)
        .bind(&active.activated_by)
        .execute(&mut *tx)
        .await?;

        self.insert_audit_entry(&mut tx, &audit_entry, seq).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_only(&self, audit_entry: SloAuditEntry) -> ApiResult<()> {
        let _guard = self.write_lock.lock().await;
        let seq = self.next_insertion_seq().await?;
        let mut tx = self.pool.begin().await?;
        self.insert_audit_entry(&mut tx, &audit_entry, seq).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, service_id: &str) -> ApiResult<Vec<SloAuditEntry>> {
        let rows: Vec<SloAuditEntryRow> = sqlx::query_as(
            "SELECT * FROM slo_audit_log WHERE service_id = ? ORDER BY insertion_seq DESC",
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }
}

/// In-memory repository for tests: same atomicity/ordering guarantees,
/// backed by a `DashMap` rather than a database.
#[derive(Default)]
pub struct MemorySloRepository {
    active: DashMap<String, ActiveSlo>,
    audit: Arc<DashMap<String, Vec<SloAuditEntry>>>,
    insertion_seq: AtomicI64,
}

impl MemorySloRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&self, entry: SloAuditEntry) {
        self.insertion_seq.fetch_add(1, Ordering::Relaxed);
        self.audit.entry(entry.service_id.clone()).or_default().push(entry);
    }
}

#[async_trait]
impl SloRepository for MemorySloRepository {
    async fn get_active(&self, service_id: &str) -> ApiResult<Option<ActiveSlo>> {
        Ok(self.active.get(service_id).map(|r| r.clone()))
    }

    async fn set_active_and_append(&self, active: ActiveSlo, audit_entry: SloAuditEntry) -> ApiResult<()> {
        self.active.insert(active.service_id.clone(), active);
        self.append(audit_entry);
        Ok(())
    }

    async fn append_only(&self, audit_entry: SloAuditEntry) -> ApiResult<()> {
        self.append(audit_entry);
        Ok(())
    }

    async fn history(&self, service_id: &str) -> ApiResult<Vec<SloAuditEntry>> {
        let mut entries = self.audit.get(service_id).map(|r| r.clone()).unwrap_or_default();
        entries.reverse();
        Ok(entries)
    }
}
