use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// The privileged operations that bypass or augment normal flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(30)", rename_all = "snake_case")]
pub enum AdminAction {
    #[serde(rename = "force_complete")]
    ForceComplete,
    #[serde(rename = "manual_status_change")]
    ManualStatusChange,
    #[serde(rename = "capture_retry")]
    CaptureRetry,
    #[serde(rename = "refund")]
    Refund,
    #[serde(rename = "reassign_provider")]
    ReassignProvider,
    #[serde(rename = "toggle_provider_active")]
    ToggleProviderActive,
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAction::ForceComplete => write!(f, "force_complete"),
            AdminAction::ManualStatusChange => write!(f, "manual_status_change"),
            AdminAction::CaptureRetry => write!(f, "capture_retry"),
            AdminAction::Refund => write!(f, "refund"),
            AdminAction::ReassignProvider => write!(f, "reassign_provider"),
            AdminAction::ToggleProviderActive => write!(f, "toggle_provider_active"),
        }
    }
}

/// One entry in the append-only admin audit trail.
///
/// Every override records who did it and why; a blank reason is a usage
/// error, not something to be silently tolerated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: Option<String>,

    /// Admin who performed the override
    pub actor_id: String,

    pub action: AdminAction,

    /// Affected job, when the action targets one
    pub job_id: Option<String>,

    /// Human-readable justification, required
    pub reason: String,

    /// Action-specific context (per-hold outcomes, old/new status, ...)
    pub detail: Json<serde_json::Value>,

    pub created_at: Option<DateTime<Utc>>,
}

impl AuditEntry {
    pub fn new(
        actor_id: String,
        action: AdminAction,
        job_id: Option<String>,
        reason: &str,
        detail: serde_json::Value,
    ) -> Result<Self> {
        if actor_id.trim().is_empty() {
            return Err(AppError::validation("Audit actor ID cannot be empty"));
        }
        if reason.trim().is_empty() {
            return Err(AppError::validation(format!(
                "A reason is required for '{}'",
                action
            )));
        }

        Ok(Self {
            id: Some(Uuid::new_v4().to_string()),
            actor_id,
            action,
            job_id,
            reason: reason.trim().to_string(),
            detail: Json(detail),
            created_at: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_entry_requires_reason() {
        let missing = AuditEntry::new(
            "admin-1".to_string(),
            AdminAction::Refund,
            Some("job-1".to_string()),
            "  ",
            serde_json::json!({}),
        );
        assert!(missing.is_err());

        let present = AuditEntry::new(
            "admin-1".to_string(),
            AdminAction::Refund,
            Some("job-1".to_string()),
            "customer request",
            serde_json::json!({"kind": "diagnostic"}),
        )
        .unwrap();
        assert_eq!(present.reason, "customer request");
    }
}
