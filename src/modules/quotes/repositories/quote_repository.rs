use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::quotes::models::{QuoteStatus, RepairQuote};

/// Repository for repair quote database operations
pub struct QuoteRepository {
    pool: MySqlPool,
}

impl QuoteRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a new quote.
    ///
    /// `job_id` carries a unique index; a second quote for the same job
    /// surfaces as `DuplicateQuote` even when two submissions race past the
    /// existence check.
    pub async fn create(&self, quote: &RepairQuote) -> Result<RepairQuote> {
        sqlx::query(
            r#"
            INSERT INTO repair_quotes (
                id, job_id, provider_id, labor_cost, parts_cost, total_amount,
                notes, status, decline_reason, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.job_id)
        .bind(&quote.provider_id)
        .bind(quote.labor_cost)
        .bind(quote.parts_cost)
        .bind(quote.total_amount)
        .bind(&quote.notes)
        .bind(quote.status)
        .bind(&quote.decline_reason)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateQuote(format!(
                        "Job '{}' already has a quote",
                        quote.job_id
                    ));
                }
            }
            AppError::Internal(format!("Failed to create quote: {}", e))
        })?;

        Ok(quote.clone())
    }

    /// Find quote by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<RepairQuote>> {
        sqlx::query_as::<_, RepairQuote>(
            r#"
            SELECT id, job_id, provider_id, labor_cost, parts_cost, total_amount,
                   notes, status, decline_reason, created_at, updated_at
            FROM repair_quotes
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch quote: {}", e)))
    }

    /// Find quote by ID, failing with NotFound when absent
    pub async fn get(&self, id: &str) -> Result<RepairQuote> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Quote '{}' not found", id)))
    }

    /// Find the quote for a job, if any
    pub async fn find_by_job_id(&self, job_id: &str) -> Result<Option<RepairQuote>> {
        sqlx::query_as::<_, RepairQuote>(
            r#"
            SELECT id, job_id, provider_id, labor_cost, parts_cost, total_amount,
                   notes, status, decline_reason, created_at, updated_at
            FROM repair_quotes
            WHERE job_id = ?
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch quote: {}", e)))
    }

    /// Persist a status change decided by the model.
    ///
    /// Conditional on the quote still being pending; a race with another
    /// decision surfaces as `StaleJobState`.
    pub async fn update_decision(&self, quote: &RepairQuote) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE repair_quotes
            SET status = ?, decline_reason = ?, updated_at = NOW()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(quote.status)
        .bind(&quote.decline_reason)
        .bind(&quote.id)
        .bind(QuoteStatus::Pending)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update quote: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleJobState(format!(
                "Quote '{}' was already decided",
                quote.id.as_deref().unwrap_or("?")
            )));
        }

        Ok(())
    }
}
