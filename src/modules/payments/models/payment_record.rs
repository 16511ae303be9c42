use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::payments::services::payout_calculator;

/// Which of a job's two holds an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPurpose {
    Diagnostic,
    Repair,
}

impl std::fmt::Display for HoldPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldPurpose::Diagnostic => write!(f, "diagnostic"),
            HoldPurpose::Repair => write!(f, "repair"),
        }
    }
}

impl std::str::FromStr for HoldPurpose {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "diagnostic" => Ok(HoldPurpose::Diagnostic),
            "repair" => Ok(HoldPurpose::Repair),
            _ => Err(format!("Invalid hold purpose: {}", s)),
        }
    }
}

/// Payment record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Record exists but nothing is captured and no capture is in flight
    /// (also the flagged state after an admin skipped capture)
    #[serde(rename = "pending")]
    Pending,

    /// At least one hold authorized, nothing captured yet
    #[serde(rename = "authorized")]
    Authorized,

    /// All captures for the settlement succeeded
    #[serde(rename = "captured")]
    Captured,

    /// A capture attempt failed, possibly after other holds captured;
    /// per-hold detail lives with the admin retry surface
    #[serde(rename = "failed")]
    Failed,

    /// Captured funds were returned
    #[serde(rename = "refunded")]
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Authorized => write!(f, "authorized"),
            PaymentStatus::Captured => write!(f, "captured"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// One refund issued against this record, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEntry {
    /// Which hold the refund was issued against
    pub purpose: HoldPurpose,

    /// Refunded amount
    pub amount: Decimal,

    /// Gateway reference for the refund
    pub external_ref: String,

    pub refunded_at: DateTime<Utc>,
}

/// The ledger entry for a job, one per job, upserted.
///
/// Totals and the platform/provider split are always rebuilt from the
/// source-of-truth captured amounts rather than patched incrementally, so
/// retries and admin overrides cannot make the record drift.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    /// Unique record ID (UUID)
    pub id: Option<String>,

    /// Owning job; unique, the upsert key
    pub job_id: String,

    /// Sum of amounts this record accounts for
    pub total_amount: Decimal,

    /// Platform share of `total_amount`
    pub platform_fee: Decimal,

    /// Provider share of `total_amount`
    pub provider_payout: Decimal,

    pub status: PaymentStatus,

    /// Set when an admin completed the job without capturing; reconciliation
    /// queries use this to find money the platform never collected
    pub capture_skipped: bool,

    /// When the settlement capture completed
    pub captured_at: Option<DateTime<Utc>>,

    /// Append-only refund history
    pub refunds: Json<Vec<RefundEntry>>,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// Create the record when the first (diagnostic) hold is authorized.
    ///
    /// The split is computed immediately so the fee/payout invariant holds
    /// from the first write, not just after capture.
    pub fn new_authorized(job_id: String, authorized_total: Decimal) -> Result<Self> {
        if job_id.trim().is_empty() {
            return Err(AppError::validation("Job ID cannot be empty"));
        }
        crate::core::money::validate_amount("Authorized total", authorized_total)?;

        let split = payout_calculator::split(authorized_total);
        let now = Utc::now();

        Ok(Self {
            id: Some(Uuid::new_v4().to_string()),
            job_id,
            total_amount: authorized_total,
            platform_fee: split.platform_fee,
            provider_payout: split.provider_payout,
            status: PaymentStatus::Authorized,
            capture_skipped: false,
            captured_at: None,
            refunds: Json(Vec::new()),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    /// Rebuild totals from the captured amounts and mark the record settled
    pub fn settle(&mut self, total_captured: Decimal) {
        let split = payout_calculator::split(total_captured);
        self.total_amount = total_captured;
        self.platform_fee = split.platform_fee;
        self.provider_payout = split.provider_payout;
        self.status = PaymentStatus::Captured;
        self.capture_skipped = false;
        self.captured_at = Some(Utc::now());
        self.updated_at = Some(Utc::now());
    }

    /// Mark the record as settled-without-capture (admin skip path)
    pub fn mark_capture_skipped(&mut self) {
        self.status = PaymentStatus::Pending;
        self.capture_skipped = true;
        self.captured_at = None;
        self.updated_at = Some(Utc::now());
    }

    /// Record a failed capture attempt; amounts keep their last known values
    pub fn mark_failed(&mut self) {
        self.status = PaymentStatus::Failed;
        self.updated_at = Some(Utc::now());
    }

    /// Append a refund and move the record to refunded
    pub fn record_refund(&mut self, entry: RefundEntry) {
        self.refunds.0.push(entry);
        self.status = PaymentStatus::Refunded;
        self.updated_at = Some(Utc::now());
    }

    /// Total refunded so far
    pub fn total_refunded(&self) -> Decimal {
        self.refunds.0.iter().map(|r| r.amount).sum()
    }

    /// The fee/payout invariant; checked by tests on every mutation path
    pub fn split_is_consistent(&self) -> bool {
        self.platform_fee + self.provider_payout == self.total_amount
            && self.platform_fee == payout_calculator::split(self.total_amount).platform_fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_new_authorized_computes_split() {
        let record = PaymentRecord::new_authorized("job-1".to_string(), dec("85.00")).unwrap();

        assert_eq!(record.status, PaymentStatus::Authorized);
        assert_eq!(record.total_amount, dec("85.00"));
        assert_eq!(record.platform_fee, dec("12.75"));
        assert_eq!(record.provider_payout, dec("72.25"));
        assert!(record.split_is_consistent());
        assert!(!record.capture_skipped);
    }

    #[test]
    fn test_new_authorized_rejects_bad_amounts() {
        assert!(PaymentRecord::new_authorized("job-1".to_string(), Decimal::ZERO).is_err());
        assert!(PaymentRecord::new_authorized("job-1".to_string(), dec("-5")).is_err());
        assert!(PaymentRecord::new_authorized("".to_string(), dec("85.00")).is_err());
    }

    #[test]
    fn test_settle_recomputes_from_captured_total() {
        let mut record = PaymentRecord::new_authorized("job-1".to_string(), dec("85.00")).unwrap();

        // Repair hold captured too; totals rebuilt from captures, not patched
        record.settle(dec("435.00"));

        assert_eq!(record.status, PaymentStatus::Captured);
        assert_eq!(record.total_amount, dec("435.00"));
        assert_eq!(record.platform_fee, dec("65.25"));
        assert_eq!(record.provider_payout, dec("369.75"));
        assert!(record.captured_at.is_some());
        assert!(record.split_is_consistent());
    }

    #[test]
    fn test_settle_is_idempotent_on_amounts() {
        let mut record = PaymentRecord::new_authorized("job-1".to_string(), dec("85.00")).unwrap();
        record.settle(dec("435.00"));
        let first_fee = record.platform_fee;

        record.settle(dec("435.00"));
        assert_eq!(record.platform_fee, first_fee);
        assert!(record.split_is_consistent());
    }

    #[test]
    fn test_capture_skipped_flag_distinguishes_record() {
        let mut record = PaymentRecord::new_authorized("job-1".to_string(), dec("85.00")).unwrap();
        record.mark_capture_skipped();

        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(record.capture_skipped);
        assert!(record.captured_at.is_none());
    }

    #[test]
    fn test_refunds_are_append_only() {
        let mut record = PaymentRecord::new_authorized("job-1".to_string(), dec("85.00")).unwrap();
        record.settle(dec("85.00"));

        record.record_refund(RefundEntry {
            purpose: HoldPurpose::Diagnostic,
            amount: dec("40.00"),
            external_ref: "re_1".to_string(),
            refunded_at: Utc::now(),
        });
        record.record_refund(RefundEntry {
            purpose: HoldPurpose::Diagnostic,
            amount: dec("45.00"),
            external_ref: "re_2".to_string(),
            refunded_at: Utc::now(),
        });

        assert_eq!(record.status, PaymentStatus::Refunded);
        assert_eq!(record.refunds.0.len(), 2);
        assert_eq!(record.total_refunded(), dec("85.00"));
    }

    #[test]
    fn test_hold_purpose_round_trip() {
        assert_eq!(
            HoldPurpose::from_str("diagnostic").unwrap(),
            HoldPurpose::Diagnostic
        );
        assert_eq!(HoldPurpose::from_str("repair").unwrap(), HoldPurpose::Repair);
        assert!(HoldPurpose::from_str("both").is_err());
    }
}
