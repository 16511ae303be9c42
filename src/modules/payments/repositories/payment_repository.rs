use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::payments::models::PaymentRecord;

/// Repository for the payment ledger
///
/// One record per job (`job_id` is unique); writes are upserts so the record
/// converges on whatever the holds actually did, no matter how many times a
/// settlement or retry runs.
pub struct PaymentRepository {
    pool: MySqlPool,
}

impl PaymentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert or update the record for its job
    pub async fn upsert(&self, record: &PaymentRecord) -> Result<PaymentRecord> {
        let refunds_json = serde_json::to_value(&record.refunds.0)?;

        sqlx::query(
            r#"
            INSERT INTO payment_records (
                id, job_id, total_amount, platform_fee, provider_payout,
                status, capture_skipped, captured_at, refunds, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                total_amount = VALUES(total_amount),
                platform_fee = VALUES(platform_fee),
                provider_payout = VALUES(provider_payout),
                status = VALUES(status),
                capture_skipped = VALUES(capture_skipped),
                captured_at = VALUES(captured_at),
                refunds = VALUES(refunds),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&record.id)
        .bind(&record.job_id)
        .bind(record.total_amount)
        .bind(record.platform_fee)
        .bind(record.provider_payout)
        .bind(record.status)
        .bind(record.capture_skipped)
        .bind(record.captured_at)
        .bind(refunds_json)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to upsert payment record: {}", e)))?;

        self.find_by_job_id(&record.job_id)
            .await?
            .ok_or_else(|| AppError::internal("Payment record vanished after upsert"))
    }

    /// Find the ledger record for a job
    pub async fn find_by_job_id(&self, job_id: &str) -> Result<Option<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, job_id, total_amount, platform_fee, provider_payout,
                   status, capture_skipped, captured_at, refunds, created_at, updated_at
            FROM payment_records
            WHERE job_id = ?
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment record: {}", e)))
    }

    /// Find a record by its own id (admin capture-retry addresses records directly)
    pub async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, job_id, total_amount, platform_fee, provider_payout,
                   status, capture_skipped, captured_at, refunds, created_at, updated_at
            FROM payment_records
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment record: {}", e)))
    }

    /// Records flagged by the skip-capture override, for reconciliation
    pub async fn list_capture_skipped(&self) -> Result<Vec<PaymentRecord>> {
        sqlx::query_as::<_, PaymentRecord>(
            r#"
            SELECT id, job_id, total_amount, platform_fee, provider_payout,
                   status, capture_skipped, captured_at, refunds, created_at, updated_at
            FROM payment_records
            WHERE capture_skipped = TRUE
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list flagged records: {}", e)))
    }
}
