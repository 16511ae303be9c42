use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Minimum length for a job description
pub const DESCRIPTION_MIN_LEN: usize = 10;
/// Maximum length for a job description
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Job lifecycle status
///
/// This is the canonical status vocabulary. Booking-facing phrasings
/// ("diagnostic visit scheduled", "repair pending approval") are display
/// names for these states and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "snake_case")]
pub enum JobStatus {
    /// Homeowner submitted the request
    #[serde(rename = "submitted")]
    #[default]
    Submitted,

    /// AI triage in progress
    #[serde(rename = "ai_diagnosis")]
    AiDiagnosis,

    /// Triage concluded the homeowner can fix it themselves (terminal)
    #[serde(rename = "resolved_diy")]
    ResolvedDiy,

    /// Waiting for a provider match
    #[serde(rename = "pending_match")]
    PendingMatch,

    /// Provider matched, diagnostic visit not yet booked
    #[serde(rename = "matched")]
    Matched,

    /// Diagnostic visit booked; the diagnostic-fee hold exists
    #[serde(rename = "accepted")]
    Accepted,

    /// Provider is on site / working
    #[serde(rename = "in_progress")]
    InProgress,

    /// Work finished and settled (terminal)
    #[serde(rename = "completed")]
    Completed,

    /// Cancelled by either party or an admin (terminal)
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl JobStatus {
    /// Every status, in lifecycle order; used by exhaustive table tests
    pub const ALL: [JobStatus; 9] = [
        JobStatus::Submitted,
        JobStatus::AiDiagnosis,
        JobStatus::ResolvedDiy,
        JobStatus::PendingMatch,
        JobStatus::Matched,
        JobStatus::Accepted,
        JobStatus::InProgress,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    /// The forward edges of the lifecycle table.
    ///
    /// `Cancelled` is reachable from every non-terminal status and is handled
    /// separately in [`JobStatus::can_transition`] rather than repeated here.
    pub fn allowed_next(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Submitted => &[JobStatus::AiDiagnosis],
            JobStatus::AiDiagnosis => &[JobStatus::ResolvedDiy, JobStatus::PendingMatch],
            JobStatus::PendingMatch => &[JobStatus::Matched],
            JobStatus::Matched => &[JobStatus::Accepted],
            JobStatus::Accepted => &[JobStatus::InProgress],
            JobStatus::InProgress => &[JobStatus::Completed],
            JobStatus::ResolvedDiy | JobStatus::Completed | JobStatus::Cancelled => &[],
        }
    }

    /// Terminal statuses permit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::ResolvedDiy | JobStatus::Completed | JobStatus::Cancelled
        )
    }

    /// Whether `target` is a legal next status from `self`
    pub fn can_transition(&self, target: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == JobStatus::Cancelled {
            return true;
        }
        self.allowed_next().contains(&target)
    }

    /// Pure transition gate: `Ok(())` or `InvalidTransition`, no side effects
    pub fn ensure_transition(&self, target: JobStatus) -> Result<()> {
        if self.can_transition(target) {
            Ok(())
        } else {
            Err(AppError::invalid_transition(
                self.to_string(),
                target.to_string(),
            ))
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::AiDiagnosis => write!(f, "ai_diagnosis"),
            JobStatus::ResolvedDiy => write!(f, "resolved_diy"),
            JobStatus::PendingMatch => write!(f, "pending_match"),
            JobStatus::Matched => write!(f, "matched"),
            JobStatus::Accepted => write!(f, "accepted"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(JobStatus::Submitted),
            "ai_diagnosis" => Ok(JobStatus::AiDiagnosis),
            "resolved_diy" => Ok(JobStatus::ResolvedDiy),
            "pending_match" => Ok(JobStatus::PendingMatch),
            "matched" => Ok(JobStatus::Matched),
            "accepted" => Ok(JobStatus::Accepted),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// A repair job request
///
/// Status is mutated only through `JobService` transitions (gated by the
/// table above) or the audited admin overrides; jobs are never deleted,
/// cancellation is a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRequest {
    /// Unique job ID (UUID)
    #[serde(skip_deserializing)]
    pub id: Option<String>,

    /// Homeowner who opened the request
    pub homeowner_id: String,

    /// Assigned provider, null until matched
    pub provider_id: Option<String>,

    /// Problem category (plumbing, electrical, ...)
    pub category: String,

    /// Free-text problem description
    pub description: String,

    /// Current lifecycle status
    #[serde(skip_deserializing)]
    pub status: JobStatus,

    /// Reference to the diagnostic-fee hold at the gateway, once placed
    pub diagnostic_hold_ref: Option<String>,

    /// Reference to the repair-fee hold at the gateway, once placed
    pub repair_hold_ref: Option<String>,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobRequest {
    /// Create a new job request with validation
    pub fn new(homeowner_id: String, category: String, description: String) -> Result<Self> {
        if homeowner_id.trim().is_empty() {
            return Err(AppError::validation("Homeowner ID cannot be empty"));
        }

        if category.trim().is_empty() {
            return Err(AppError::validation("Category cannot be empty"));
        }

        let description_len = description.chars().count();
        if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&description_len) {
            return Err(AppError::validation(format!(
                "Description must be between {} and {} characters, got {}",
                DESCRIPTION_MIN_LEN, DESCRIPTION_MAX_LEN, description_len
            )));
        }

        let now = Utc::now();

        Ok(Self {
            id: Some(Uuid::new_v4().to_string()),
            homeowner_id,
            provider_id: None,
            category,
            description,
            status: JobStatus::Submitted,
            diagnostic_hold_ref: None,
            repair_hold_ref: None,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
