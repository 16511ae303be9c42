use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::providers::models::ServiceProvider;

/// Repository for service provider records
pub struct ProviderRepository {
    pool: MySqlPool,
}

impl ProviderRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a new provider
    pub async fn create(&self, provider: &ServiceProvider) -> Result<ServiceProvider> {
        sqlx::query(
            r#"
            INSERT INTO providers (id, name, trade, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.name)
        .bind(&provider.trade)
        .bind(provider.is_active)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create provider: {}", e)))?;

        Ok(provider.clone())
    }

    /// Find provider by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<ServiceProvider>> {
        sqlx::query_as::<_, ServiceProvider>(
            r#"
            SELECT id, name, trade, is_active, created_at, updated_at
            FROM providers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch provider: {}", e)))
    }

    /// Find provider by ID, failing with NotFound when absent
    pub async fn get(&self, id: &str) -> Result<ServiceProvider> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Provider '{}' not found", id)))
    }

    /// Set the availability flag
    pub async fn set_active(&self, id: &str, active: bool) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE providers
            SET is_active = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update provider: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Provider '{}' not found", id)));
        }

        Ok(())
    }
}
