use sqlx::{MySqlPool, QueryBuilder};

use crate::core::{AppError, Result};
use crate::modules::jobs::models::{JobRequest, JobStatus};

/// Filters for job history queries
#[derive(Debug, Clone, Default)]
pub struct JobHistoryFilter {
    pub homeowner_id: Option<String>,
    pub provider_id: Option<String>,
    pub status: Option<JobStatus>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository for job database operations
///
/// Every status write is conditional on the status the caller read
/// (`WHERE status = ?`); zero affected rows surfaces as `StaleJobState` so
/// racing writers never silently overwrite each other.
pub struct JobRepository {
    pool: MySqlPool,
}

impl JobRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a new job
    pub async fn create(&self, job: &JobRequest) -> Result<JobRequest> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, homeowner_id, provider_id, category, description, status,
                diagnostic_hold_ref, repair_hold_ref, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.homeowner_id)
        .bind(&job.provider_id)
        .bind(&job.category)
        .bind(&job.description)
        .bind(job.status)
        .bind(&job.diagnostic_hold_ref)
        .bind(&job.repair_hold_ref)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create job: {}", e)))?;

        Ok(job.clone())
    }

    /// Find job by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<JobRequest>> {
        sqlx::query_as::<_, JobRequest>(
            r#"
            SELECT id, homeowner_id, provider_id, category, description, status,
                   diagnostic_hold_ref, repair_hold_ref, created_at, updated_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch job: {}", e)))
    }

    /// Find job by ID, failing with NotFound when absent
    pub async fn get(&self, id: &str) -> Result<JobRequest> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Job '{}' not found", id)))
    }

    /// Move a job from `expected` to `next` status.
    ///
    /// The write only lands if the persisted status still equals `expected`.
    pub async fn transition_status(
        &self,
        id: &str,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, updated_at = NOW()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update job status: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleJobState(format!(
                "Job '{}' was not in status '{}' at write time",
                id, expected
            )));
        }

        Ok(())
    }

    /// Status transition that also records the diagnostic hold placed for it
    pub async fn transition_with_diagnostic_hold(
        &self,
        id: &str,
        expected: JobStatus,
        next: JobStatus,
        hold_ref: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, diagnostic_hold_ref = ?, updated_at = NOW()
            WHERE id = ? AND status = ? AND diagnostic_hold_ref IS NULL
            "#,
        )
        .bind(next)
        .bind(hold_ref)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to record diagnostic hold: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleJobState(format!(
                "Job '{}' changed before the diagnostic hold could be recorded",
                id
            )));
        }

        Ok(())
    }

    /// Record the repair hold placed for an approved quote.
    ///
    /// Guarded on the slot being empty; a hold ref is never overwritten.
    pub async fn set_repair_hold(&self, id: &str, hold_ref: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET repair_hold_ref = ?, updated_at = NOW()
            WHERE id = ? AND repair_hold_ref IS NULL
            "#,
        )
        .bind(hold_ref)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to record repair hold: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleJobState(format!(
                "Job '{}' already has a repair hold",
                id
            )));
        }

        Ok(())
    }

    /// Assign a provider as part of the pending_match -> matched transition
    pub async fn assign_provider(
        &self,
        id: &str,
        provider_id: &str,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, provider_id = ?, updated_at = NOW()
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next)
        .bind(provider_id)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to assign provider: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::StaleJobState(format!(
                "Job '{}' was not in status '{}' at write time",
                id, expected
            )));
        }

        Ok(())
    }

    /// Replace the assigned provider without touching status or holds.
    ///
    /// Admin reassignment path; holds stay with the job, not the provider.
    pub async fn set_provider(&self, id: &str, provider_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET provider_id = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(provider_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to set provider: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Job '{}' not found", id)));
        }

        Ok(())
    }

    /// Unconditional status write for the audited admin trapdoor
    pub async fn force_status(&self, id: &str, next: JobStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(next)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to force job status: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Job '{}' not found", id)));
        }

        Ok(())
    }

    /// List jobs matching the filter, most recent first
    pub async fn list(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRequest>> {
        let mut builder = QueryBuilder::<sqlx::MySql>::new(
            "SELECT id, homeowner_id, provider_id, category, description, status, \
             diagnostic_hold_ref, repair_hold_ref, created_at, updated_at \
             FROM jobs WHERE 1 = 1",
        );

        if let Some(homeowner_id) = &filter.homeowner_id {
            builder.push(" AND homeowner_id = ").push_bind(homeowner_id);
        }
        if let Some(provider_id) = &filter.provider_id {
            builder.push(" AND provider_id = ").push_bind(provider_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }

        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit.clamp(1, 200))
            .push(" OFFSET ")
            .push_bind(filter.offset.max(0));

        builder
            .build_query_as::<JobRequest>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to list jobs: {}", e)))
    }
}
