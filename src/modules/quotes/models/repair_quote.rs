use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{money, AppError, Result};

/// Quote lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
pub enum QuoteStatus {
    /// Submitted by the provider, awaiting the homeowner's decision
    #[serde(rename = "pending")]
    #[default]
    Pending,

    /// Homeowner authorized the repair hold for the quoted total
    #[serde(rename = "approved")]
    Approved,

    /// Homeowner declined; no payment interaction
    #[serde(rename = "declined")]
    Declined,
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteStatus::Pending => write!(f, "pending"),
            QuoteStatus::Approved => write!(f, "approved"),
            QuoteStatus::Declined => write!(f, "declined"),
        }
    }
}

/// A repair quote, at most one active per job.
///
/// `total_amount` is always `labor_cost + parts_cost`; the quote becomes
/// immutable once approved or declined.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepairQuote {
    /// Unique quote ID (UUID)
    #[serde(skip_deserializing)]
    pub id: Option<String>,

    /// Owning job (unique; the one-quote-per-job guard)
    pub job_id: String,

    /// Provider who submitted the quote
    pub provider_id: String,

    pub labor_cost: Decimal,
    pub parts_cost: Decimal,

    /// labor_cost + parts_cost, computed at creation
    #[serde(skip_deserializing)]
    pub total_amount: Decimal,

    /// Free-text notes from the on-site diagnosis
    pub notes: Option<String>,

    #[serde(skip_deserializing)]
    pub status: QuoteStatus,

    /// Reason the homeowner gave when declining
    pub decline_reason: Option<String>,

    #[serde(skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RepairQuote {
    /// Create a new quote with validation
    pub fn new(
        job_id: String,
        provider_id: String,
        labor_cost: Decimal,
        parts_cost: Decimal,
        notes: Option<String>,
    ) -> Result<Self> {
        if job_id.trim().is_empty() {
            return Err(AppError::validation("Job ID cannot be empty"));
        }
        if provider_id.trim().is_empty() {
            return Err(AppError::validation("Provider ID cannot be empty"));
        }
        if labor_cost < Decimal::ZERO || parts_cost < Decimal::ZERO {
            return Err(AppError::validation("Quote costs cannot be negative"));
        }
        if labor_cost.scale() > money::USD_SCALE || parts_cost.scale() > money::USD_SCALE {
            return Err(AppError::validation(
                "Quote costs must have at most 2 decimal places",
            ));
        }

        let total_amount = labor_cost + parts_cost;
        if total_amount <= Decimal::ZERO {
            return Err(AppError::validation("Quote total must be greater than zero"));
        }

        let now = Utc::now();

        Ok(Self {
            id: Some(Uuid::new_v4().to_string()),
            job_id,
            provider_id,
            labor_cost,
            parts_cost,
            total_amount,
            notes,
            status: QuoteStatus::Pending,
            decline_reason: None,
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == QuoteStatus::Pending
    }

    /// Mark approved; only legal while pending.
    ///
    /// Callers place the repair hold first and approve only on success.
    pub fn approve(&mut self) -> Result<()> {
        if !self.is_pending() {
            return Err(AppError::validation(format!(
                "Quote '{}' is '{}' and can no longer be approved",
                self.id.as_deref().unwrap_or("?"),
                self.status
            )));
        }
        self.status = QuoteStatus::Approved;
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Mark declined; only legal while pending
    pub fn decline(&mut self, reason: Option<String>) -> Result<()> {
        if !self.is_pending() {
            return Err(AppError::validation(format!(
                "Quote '{}' is '{}' and can no longer be declined",
                self.id.as_deref().unwrap_or("?"),
                self.status
            )));
        }
        self.status = QuoteStatus::Declined;
        self.decline_reason = reason;
        self.updated_at = Some(Utc::now());
        Ok(())
    }
}
