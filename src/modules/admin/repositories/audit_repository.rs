use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::admin::models::AuditEntry;

/// Append-only store for the admin audit trail
pub struct AuditRepository {
    pool: MySqlPool,
}

impl AuditRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Append an entry; entries are never updated or deleted
    pub async fn append(&self, entry: &AuditEntry) -> Result<AuditEntry> {
        let detail_json = serde_json::to_value(&entry.detail.0)?;

        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (id, actor_id, action, job_id, reason, detail, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.actor_id)
        .bind(entry.action)
        .bind(&entry.job_id)
        .bind(&entry.reason)
        .bind(detail_json)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to append audit entry: {}", e)))?;

        Ok(entry.clone())
    }

    /// Audit history for a job, oldest first
    pub async fn list_for_job(&self, job_id: &str) -> Result<Vec<AuditEntry>> {
        sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor_id, action, job_id, reason, detail, created_at
            FROM admin_audit_log
            WHERE job_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list audit entries: {}", e)))
    }
}
