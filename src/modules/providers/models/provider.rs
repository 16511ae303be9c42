use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// A service provider who takes on repair jobs
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceProvider {
    /// Unique provider ID (UUID)
    #[serde(skip_deserializing)]
    pub id: Option<String>,

    /// Display name of the business or person
    pub name: String,

    /// Primary trade (plumbing, electrical, ...)
    pub trade: String,

    /// Availability flag; inactive providers are excluded from matching
    /// and reassignment, flipped only through the admin surface
    #[serde(skip_deserializing)]
    pub is_active: bool,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceProvider {
    pub fn new(name: String, trade: String) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Provider name cannot be empty"));
        }
        if trade.trim().is_empty() {
            return Err(AppError::validation("Provider trade cannot be empty"));
        }

        let now = Utc::now();

        Ok(Self {
            id: Some(Uuid::new_v4().to_string()),
            name,
            trade,
            is_active: true,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider =
            ServiceProvider::new("Apex Plumbing".to_string(), "plumbing".to_string()).unwrap();
        assert!(provider.is_active);
        assert!(provider.id.is_some());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(ServiceProvider::new("  ".to_string(), "plumbing".to_string()).is_err());
    }
}
