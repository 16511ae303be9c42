use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{AppError, Result};
use crate::modules::admin::models::{AdminAction, AuditEntry};
use crate::modules::admin::repositories::AuditRepository;
use crate::modules::jobs::models::{JobRequest, JobStatus};
use crate::modules::jobs::repositories::JobRepository;
use crate::modules::payments::models::{HoldPurpose, PaymentRecord, RefundEntry};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::payments::services::{EscrowLedger, HoldState};
use crate::modules::providers::models::ServiceProvider;
use crate::modules::providers::repositories::ProviderRepository;

/// Which hold(s) an admin refund targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundTarget {
    Diagnostic,
    Repair,
    Both,
}

/// Outcome of one capture attempt inside a multi-hold operation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HoldResult {
    Captured { amount: Decimal },
    Failed { error_kind: String, error: String },
}

/// Per-hold detail for force-complete and capture-retry responses
#[derive(Debug, Clone, Serialize)]
pub struct HoldOutcome {
    pub purpose: HoldPurpose,
    pub hold_ref: String,
    #[serde(flatten)]
    pub result: HoldResult,
}

impl HoldOutcome {
    fn is_captured(&self) -> bool {
        matches!(self.result, HoldResult::Captured { .. })
    }

    fn captured_amount(&self) -> Decimal {
        match &self.result {
            HoldResult::Captured { amount } => *amount,
            HoldResult::Failed { .. } => Decimal::ZERO,
        }
    }
}

/// How much of the job's money is actually settled after a multi-hold
/// operation; callers must never have to guess this from logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    FullySettled,
    PartiallySettled,
    NotSettled,
}

/// Response for force-complete and capture-retry
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub job: JobRequest,
    pub payment: Option<PaymentRecord>,
    pub settlement: SettlementState,
    pub holds: Vec<HoldOutcome>,
    pub capture_skipped: bool,
}

/// Receipt list returned from an admin refund
#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub payment: PaymentRecord,
    pub refunds: Vec<RefundEntry>,
}

/// Privileged operations that bypass normal transition gating but still
/// leave jobs in table-recognized statuses and keep the ledger consistent.
///
/// Every operation requires a non-empty reason and appends to the audit
/// trail; capture failures inside multi-hold operations are aggregated into
/// typed per-hold outcomes instead of disappearing into log lines.
pub struct AdminService {
    jobs: JobRepository,
    payments: PaymentRepository,
    providers: ProviderRepository,
    audit: AuditRepository,
    escrow: Arc<EscrowLedger>,
}

impl AdminService {
    pub fn new(
        jobs: JobRepository,
        payments: PaymentRepository,
        providers: ProviderRepository,
        audit: AuditRepository,
        escrow: Arc<EscrowLedger>,
    ) -> Self {
        Self {
            jobs,
            payments,
            providers,
            audit,
            escrow,
        }
    }

    /// Complete a job from any non-terminal status, the one intentional
    /// bypass of the lifecycle table.
    ///
    /// Without `skip_capture`, every hold on the job is captured (an
    /// already-captured hold counts as success) and the ledger is rebuilt
    /// from the captured amounts. A failing capture does not block the
    /// completion: the record is left `failed` with per-hold detail and
    /// `capture_retry` settles it later. With `skip_capture`, the record is
    /// left `pending` and flagged so reconciliation can find it.
    pub async fn force_complete(
        &self,
        job_id: &str,
        skip_capture: bool,
        actor_id: &str,
        reason: &str,
    ) -> Result<SettlementOutcome> {
        ensure_reason(AdminAction::ForceComplete, reason)?;

        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Err(AppError::invalid_transition(
                job.status.to_string(),
                JobStatus::Completed.to_string(),
            ));
        }

        let mut holds: Vec<HoldOutcome> = Vec::new();
        let mut payment = self.payments.find_by_job_id(job_id).await?;

        if skip_capture {
            if let Some(mut record) = payment.take() {
                record.mark_capture_skipped();
                payment = Some(self.payments.upsert(&record).await?);
            }
        } else {
            holds = self.capture_all(&job).await;
            payment = self
                .reconcile_record(job_id, payment, &holds)
                .await?;
        }

        self.jobs.force_status(job_id, JobStatus::Completed).await?;

        let settlement = settlement_state(&holds, skip_capture);

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::ForceComplete,
                Some(job_id.to_string()),
                reason,
                serde_json::json!({
                    "skip_capture": skip_capture,
                    "settlement": settlement,
                    "holds": &holds,
                }),
            )?)
            .await?;

        tracing::warn!(
            job_id = %job_id,
            actor_id = %actor_id,
            skip_capture,
            settlement = ?settlement,
            "Job force-completed"
        );

        Ok(SettlementOutcome {
            job: self.jobs.get(job_id).await?,
            payment,
            settlement,
            holds,
            capture_skipped: skip_capture,
        })
    }

    /// Set a job's status directly, bypassing the lifecycle table.
    ///
    /// The deliberate trapdoor for stuck jobs; rare, and always audited.
    /// The target is still a member of the canonical enumeration.
    pub async fn manual_status_change(
        &self,
        job_id: &str,
        target: JobStatus,
        actor_id: &str,
        reason: &str,
    ) -> Result<JobRequest> {
        ensure_reason(AdminAction::ManualStatusChange, reason)?;

        let job = self.jobs.get(job_id).await?;
        self.jobs.force_status(job_id, target).await?;

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::ManualStatusChange,
                Some(job_id.to_string()),
                reason,
                serde_json::json!({
                    "from": job.status,
                    "to": target,
                }),
            )?)
            .await?;

        tracing::warn!(
            job_id = %job_id,
            actor_id = %actor_id,
            from = %job.status,
            to = %target,
            "Manual status change"
        );

        self.jobs.get(job_id).await
    }

    /// Re-attempt capture for every hold on a payment record's job.
    ///
    /// Safely repeatable: already-captured holds report their prior amounts.
    /// Partial success is a valid outcome — the record goes to `failed`
    /// overall while the response carries per-hold detail.
    pub async fn capture_retry(
        &self,
        payment_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<SettlementOutcome> {
        ensure_reason(AdminAction::CaptureRetry, reason)?;

        let record = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Payment record '{}' not found", payment_id))
            })?;
        let job_id = record.job_id.clone();
        let job = self.jobs.get(&job_id).await?;

        let holds = self.capture_all(&job).await;
        let payment = self.reconcile_record(&job_id, Some(record), &holds).await?;

        let settlement = settlement_state(&holds, false);

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::CaptureRetry,
                Some(job.get_id().unwrap_or_default().to_string()),
                reason,
                serde_json::json!({
                    "payment_id": payment_id,
                    "settlement": settlement,
                    "holds": &holds,
                }),
            )?)
            .await?;

        Ok(SettlementOutcome {
            job,
            payment,
            settlement,
            holds,
            capture_skipped: false,
        })
    }

    /// Refund captured hold(s) on a job.
    ///
    /// Fails with `NothingToRefund` before touching the gateway when the
    /// requested hold was never captured, leaving all state unchanged.
    pub async fn refund(
        &self,
        job_id: &str,
        target: RefundTarget,
        amount: Option<Decimal>,
        actor_id: &str,
        reason: &str,
    ) -> Result<RefundOutcome> {
        ensure_reason(AdminAction::Refund, reason)?;

        if amount.is_some() && target == RefundTarget::Both {
            return Err(AppError::validation(
                "A partial amount cannot be combined with refunding both holds",
            ));
        }

        let job = self.jobs.get(job_id).await?;
        let mut record = self.payments.find_by_job_id(job_id).await?.ok_or_else(|| {
            AppError::NothingToRefund(format!("Job '{}' has no payment record", job_id))
        })?;

        let targets = resolve_refund_targets(&job, target)?;

        // Pre-check every hold so a two-hold refund cannot half-run
        for (purpose, hold_ref) in &targets {
            let state = self.escrow.hold_state(hold_ref).await?;
            if state != HoldState::Captured {
                return Err(AppError::NothingToRefund(format!(
                    "The {} hold on job '{}' was never captured",
                    purpose, job_id
                )));
            }
        }

        let mut issued = Vec::new();
        for (purpose, hold_ref) in &targets {
            let receipt = self.escrow.refund(hold_ref, amount).await?;
            let entry = RefundEntry {
                purpose: *purpose,
                amount: receipt.amount,
                external_ref: receipt.reference,
                refunded_at: Utc::now(),
            };
            record.record_refund(entry.clone());
            issued.push(entry);
        }

        let record = self.payments.upsert(&record).await?;

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::Refund,
                Some(job_id.to_string()),
                reason,
                serde_json::json!({
                    "target": target,
                    "amount": amount,
                    "refunds": &issued,
                }),
            )?)
            .await?;

        tracing::warn!(
            job_id = %job_id,
            actor_id = %actor_id,
            target = ?target,
            "Admin refund issued"
        );

        Ok(RefundOutcome {
            payment: record,
            refunds: issued,
        })
    }

    /// Reassign a job to a different provider.
    ///
    /// Holds are associated with the job, not the provider, so payment state
    /// is untouched; no refund/re-authorization cycle is needed.
    pub async fn reassign_provider(
        &self,
        job_id: &str,
        new_provider_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<JobRequest> {
        ensure_reason(AdminAction::ReassignProvider, reason)?;

        let job = self.jobs.get(job_id).await?;
        if job.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Job '{}' is '{}'; reassignment is only permitted on non-terminal jobs",
                job_id, job.status
            )));
        }

        let provider = self.providers.get(new_provider_id).await?;
        if !provider.is_active {
            return Err(AppError::validation(format!(
                "Provider '{}' is not currently active",
                new_provider_id
            )));
        }

        self.jobs.set_provider(job_id, new_provider_id).await?;

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::ReassignProvider,
                Some(job_id.to_string()),
                reason,
                serde_json::json!({
                    "from": job.provider_id,
                    "to": new_provider_id,
                }),
            )?)
            .await?;

        self.jobs.get(job_id).await
    }

    /// Flip a provider's availability flag
    pub async fn toggle_provider_active(
        &self,
        provider_id: &str,
        actor_id: &str,
        reason: &str,
    ) -> Result<ServiceProvider> {
        ensure_reason(AdminAction::ToggleProviderActive, reason)?;

        let provider = self.providers.get(provider_id).await?;
        let next = !provider.is_active;
        self.providers.set_active(provider_id, next).await?;

        self.audit
            .append(&AuditEntry::new(
                actor_id.to_string(),
                AdminAction::ToggleProviderActive,
                None,
                reason,
                serde_json::json!({
                    "provider_id": provider_id,
                    "is_active": next,
                }),
            )?)
            .await?;

        self.providers.get(provider_id).await
    }

    /// Records flagged by the skip-capture path, for reconciliation
    pub async fn list_flagged_payments(&self) -> Result<Vec<PaymentRecord>> {
        self.payments.list_capture_skipped().await
    }

    /// Audit trail for a job
    pub async fn audit_for_job(&self, job_id: &str) -> Result<Vec<AuditEntry>> {
        self.audit.list_for_job(job_id).await
    }

    /// Attempt capture for each hold on the job, aggregating typed outcomes
    /// instead of failing at the first error
    async fn capture_all(&self, job: &JobRequest) -> Vec<HoldOutcome> {
        let mut outcomes = Vec::new();

        let holds = [
            (HoldPurpose::Diagnostic, job.diagnostic_hold_ref.as_deref()),
            (HoldPurpose::Repair, job.repair_hold_ref.as_deref()),
        ];

        for (purpose, hold_ref) in holds {
            let Some(hold_ref) = hold_ref else { continue };

            let result = match self.escrow.capture(hold_ref).await {
                Ok(amount) => HoldResult::Captured { amount },
                Err(e) => {
                    tracing::warn!(
                        hold_ref = %hold_ref,
                        purpose = %purpose,
                        error = %e,
                        "Capture failed during admin settlement"
                    );
                    HoldResult::Failed {
                        error_kind: e.kind().to_string(),
                        error: e.to_string(),
                    }
                }
            };

            outcomes.push(HoldOutcome {
                purpose,
                hold_ref: hold_ref.to_string(),
                result,
            });
        }

        outcomes
    }

    /// Rebuild the ledger record from the capture outcomes and persist it
    async fn reconcile_record(
        &self,
        job_id: &str,
        existing: Option<PaymentRecord>,
        holds: &[HoldOutcome],
    ) -> Result<Option<PaymentRecord>> {
        let captured_total: Decimal = holds.iter().map(HoldOutcome::captured_amount).sum();
        let any_failed = holds.iter().any(|h| !h.is_captured());

        let mut record = match existing {
            Some(record) => record,
            None if captured_total > Decimal::ZERO => {
                PaymentRecord::new_authorized(job_id.to_string(), captured_total)?
            }
            None => return Ok(None),
        };

        if captured_total > Decimal::ZERO {
            record.settle(captured_total);
        }
        if any_failed {
            record.mark_failed();
        }

        Ok(Some(self.payments.upsert(&record).await?))
    }
}

fn ensure_reason(action: AdminAction, reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(AppError::validation(format!(
            "A non-empty reason is required for '{}'",
            action
        )));
    }
    Ok(())
}

/// Map a refund target onto the job's actual hold refs
fn resolve_refund_targets(
    job: &JobRequest,
    target: RefundTarget,
) -> Result<Vec<(HoldPurpose, String)>> {
    let job_id = job.get_id().unwrap_or("?");
    let diagnostic = job
        .diagnostic_hold_ref
        .clone()
        .map(|r| (HoldPurpose::Diagnostic, r));
    let repair = job.repair_hold_ref.clone().map(|r| (HoldPurpose::Repair, r));

    let targets: Vec<(HoldPurpose, String)> = match target {
        RefundTarget::Diagnostic => diagnostic.into_iter().collect(),
        RefundTarget::Repair => repair.into_iter().collect(),
        RefundTarget::Both => diagnostic.into_iter().chain(repair).collect(),
    };

    if targets.is_empty() {
        return Err(AppError::NothingToRefund(format!(
            "Job '{}' has no matching hold to refund",
            job_id
        )));
    }

    Ok(targets)
}

/// Classify the aggregate settlement so callers can tell fully, partially,
/// and not settled apart without parsing per-hold detail
fn settlement_state(holds: &[HoldOutcome], capture_skipped: bool) -> SettlementState {
    if capture_skipped || holds.is_empty() {
        return SettlementState::NotSettled;
    }

    let captured = holds.iter().filter(|h| h.is_captured()).count();
    if captured == holds.len() {
        SettlementState::FullySettled
    } else if captured > 0 {
        SettlementState::PartiallySettled
    } else {
        SettlementState::NotSettled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn outcome(purpose: HoldPurpose, result: HoldResult) -> HoldOutcome {
        HoldOutcome {
            purpose,
            hold_ref: format!("pi_{}", purpose),
            result,
        }
    }

    #[test]
    fn test_settlement_state_classification() {
        let both_captured = vec![
            outcome(HoldPurpose::Diagnostic, HoldResult::Captured { amount: dec("85.00") }),
            outcome(HoldPurpose::Repair, HoldResult::Captured { amount: dec("350.00") }),
        ];
        assert_eq!(
            settlement_state(&both_captured, false),
            SettlementState::FullySettled
        );

        let partial = vec![
            outcome(HoldPurpose::Diagnostic, HoldResult::Captured { amount: dec("85.00") }),
            outcome(
                HoldPurpose::Repair,
                HoldResult::Failed {
                    error_kind: "hold_not_capturable".to_string(),
                    error: "expired".to_string(),
                },
            ),
        ];
        assert_eq!(
            settlement_state(&partial, false),
            SettlementState::PartiallySettled
        );

        let none = vec![outcome(
            HoldPurpose::Diagnostic,
            HoldResult::Failed {
                error_kind: "gateway_unavailable".to_string(),
                error: "timeout".to_string(),
            },
        )];
        assert_eq!(settlement_state(&none, false), SettlementState::NotSettled);

        assert_eq!(settlement_state(&[], false), SettlementState::NotSettled);
        assert_eq!(
            settlement_state(&both_captured, true),
            SettlementState::NotSettled
        );
    }

    #[test]
    fn test_resolve_refund_targets() {
        let mut job = JobRequest::new(
            "owner-1".to_string(),
            "plumbing".to_string(),
            "Kitchen sink leaks under the trap".to_string(),
        )
        .unwrap();

        // No holds at all
        assert!(resolve_refund_targets(&job, RefundTarget::Diagnostic).is_err());

        job.diagnostic_hold_ref = Some("pi_diag".to_string());
        let targets = resolve_refund_targets(&job, RefundTarget::Diagnostic).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, HoldPurpose::Diagnostic);

        // Repair requested but only diagnostic exists
        assert!(resolve_refund_targets(&job, RefundTarget::Repair).is_err());

        job.repair_hold_ref = Some("pi_repair".to_string());
        let both = resolve_refund_targets(&job, RefundTarget::Both).unwrap();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_ensure_reason() {
        assert!(ensure_reason(AdminAction::Refund, "customer request").is_ok());
        assert!(ensure_reason(AdminAction::Refund, "").is_err());
        assert!(ensure_reason(AdminAction::Refund, "   ").is_err());
    }
}
