use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{AppError, Result};
use crate::modules::jobs::models::{JobRequest, JobStatus};
use crate::modules::jobs::repositories::{JobHistoryFilter, JobRepository};
use crate::modules::notifications::{NotificationEvent, Notifier};
use crate::modules::payments::models::{HoldPurpose, PaymentRecord, PaymentStatus};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::payments::services::EscrowLedger;
use crate::modules::providers::repositories::ProviderRepository;
use crate::modules::quotes::models::RepairQuote;
use crate::modules::quotes::repositories::QuoteRepository;

/// Where triage sends a job after diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageOutcome {
    /// Homeowner can fix it themselves; job ends
    Diy,
    /// Needs a professional; proceed to matching
    Match,
}

/// A job together with its quote and ledger record
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    pub job: JobRequest,
    pub quote: Option<RepairQuote>,
    pub payment: Option<PaymentRecord>,
}

/// The job lifecycle orchestrator.
///
/// Every handler follows the same ordering discipline: the escrow operation
/// runs first and the status/ledger write lands only after it succeeded, so
/// a job is never marked further along than the money actually is. The
/// transition gate itself (`JobStatus::ensure_transition`) is pure; this
/// service is the only normal-flow path that writes a status.
pub struct JobService {
    jobs: JobRepository,
    quotes: QuoteRepository,
    payments: PaymentRepository,
    providers: ProviderRepository,
    escrow: Arc<EscrowLedger>,
    notifier: Arc<Notifier>,
    diagnostic_fee: Decimal,
}

impl JobService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: JobRepository,
        quotes: QuoteRepository,
        payments: PaymentRepository,
        providers: ProviderRepository,
        escrow: Arc<EscrowLedger>,
        notifier: Arc<Notifier>,
        diagnostic_fee: Decimal,
    ) -> Self {
        Self {
            jobs,
            quotes,
            payments,
            providers,
            escrow,
            notifier,
            diagnostic_fee,
        }
    }

    /// Create a new job in `submitted`
    pub async fn create_job(
        &self,
        homeowner_id: &str,
        category: String,
        description: String,
    ) -> Result<JobRequest> {
        let job = JobRequest::new(homeowner_id.to_string(), category, description)?;
        let job = self.jobs.create(&job).await?;

        tracing::info!(
            job_id = job.get_id().unwrap_or("?"),
            homeowner_id = %homeowner_id,
            "Job created"
        );

        Ok(job)
    }

    /// Kick off AI triage: submitted -> ai_diagnosis
    pub async fn begin_triage(&self, job_id: &str) -> Result<JobRequest> {
        self.transition(job_id, JobStatus::AiDiagnosis).await
    }

    /// Record the triage outcome: ai_diagnosis -> resolved_diy | pending_match
    pub async fn record_triage_outcome(
        &self,
        job_id: &str,
        outcome: TriageOutcome,
    ) -> Result<JobRequest> {
        let target = match outcome {
            TriageOutcome::Diy => JobStatus::ResolvedDiy,
            TriageOutcome::Match => JobStatus::PendingMatch,
        };
        self.transition(job_id, target).await
    }

    /// Assign an active provider: pending_match -> matched
    pub async fn match_provider(&self, job_id: &str, provider_id: &str) -> Result<JobRequest> {
        let job = self.jobs.get(job_id).await?;
        job.status.ensure_transition(JobStatus::Matched)?;

        let provider = self.providers.get(provider_id).await?;
        if !provider.is_active {
            return Err(AppError::validation(format!(
                "Provider '{}' is not currently active",
                provider_id
            )));
        }

        self.jobs
            .assign_provider(job_id, provider_id, job.status, JobStatus::Matched)
            .await?;

        tracing::info!(job_id = %job_id, provider_id = %provider_id, "Provider matched");

        self.jobs.get(job_id).await
    }

    /// Book the diagnostic visit: place the diagnostic-fee hold, open the
    /// ledger record, then matched -> accepted.
    ///
    /// The hold is placed before anything is persisted; a declined card
    /// leaves the job exactly where it was.
    pub async fn book_diagnostic(
        &self,
        job_id: &str,
        homeowner_id: &str,
        payment_method: Option<String>,
    ) -> Result<JobRequest> {
        let job = self.jobs.get(job_id).await?;
        self.ensure_homeowner(&job, homeowner_id)?;
        job.status.ensure_transition(JobStatus::Accepted)?;

        let hold_ref = self
            .escrow
            .place_hold(
                job_id,
                HoldPurpose::Diagnostic,
                self.diagnostic_fee,
                payment_method,
            )
            .await?;

        // The ledger record exists from the first authorized hold onward
        let record = PaymentRecord::new_authorized(job_id.to_string(), self.diagnostic_fee)?;
        self.payments.upsert(&record).await?;

        self.jobs
            .transition_with_diagnostic_hold(job_id, job.status, JobStatus::Accepted, &hold_ref)
            .await?;

        self.notifier.notify(NotificationEvent::HoldPlaced {
            job_id: job_id.to_string(),
            purpose: HoldPurpose::Diagnostic.to_string(),
            amount: self.diagnostic_fee,
        });

        self.jobs.get(job_id).await
    }

    /// Provider starts the visit: accepted -> in_progress
    pub async fn start_work(&self, job_id: &str, provider_id: &str) -> Result<JobRequest> {
        let job = self.jobs.get(job_id).await?;
        self.ensure_provider(&job, provider_id)?;
        job.status.ensure_transition(JobStatus::InProgress)?;

        self.jobs
            .transition_status(job_id, job.status, JobStatus::InProgress)
            .await?;

        self.jobs.get(job_id).await
    }

    /// Settle and complete: capture every hold on the job, split the captured
    /// total, upsert the ledger, then in_progress -> completed.
    ///
    /// Captures are idempotent, so retrying after `GatewayUnavailable` is
    /// safe: already-captured holds report their prior amounts and the
    /// ledger is rebuilt from those, not incremented.
    pub async fn mark_complete(&self, job_id: &str, provider_id: &str) -> Result<JobDetail> {
        let job = self.jobs.get(job_id).await?;
        self.ensure_provider(&job, provider_id)?;
        job.status.ensure_transition(JobStatus::Completed)?;

        let mut total_captured = Decimal::ZERO;
        for hold_ref in [&job.diagnostic_hold_ref, &job.repair_hold_ref]
            .into_iter()
            .flatten()
        {
            total_captured += self.escrow.capture(hold_ref).await?;
        }

        if total_captured <= Decimal::ZERO {
            return Err(AppError::validation(format!(
                "Job '{}' has no captured funds to settle",
                job_id
            )));
        }

        let mut record = match self.payments.find_by_job_id(job_id).await? {
            Some(record) => record,
            None => PaymentRecord::new_authorized(job_id.to_string(), total_captured)?,
        };
        record.settle(total_captured);
        let record = self.payments.upsert(&record).await?;

        self.jobs
            .transition_status(job_id, job.status, JobStatus::Completed)
            .await?;

        tracing::info!(
            job_id = %job_id,
            total_captured = %total_captured,
            platform_fee = %record.platform_fee,
            provider_payout = %record.provider_payout,
            "Job completed and settled"
        );

        self.notifier.notify(NotificationEvent::JobCompleted {
            job_id: job_id.to_string(),
            total_captured,
        });

        self.get_job_detail(job_id).await
    }

    /// Cancel from any non-terminal status.
    ///
    /// Captured funds block cancellation: the money has to be explicitly
    /// refunded by an admin first rather than silently returned here.
    /// Merely authorized holds are left to lapse at the gateway.
    pub async fn cancel(&self, job_id: &str, actor_id: &str) -> Result<JobRequest> {
        let job = self.jobs.get(job_id).await?;
        self.ensure_party(&job, actor_id)?;
        job.status.ensure_transition(JobStatus::Cancelled)?;

        if let Some(record) = self.payments.find_by_job_id(job_id).await? {
            if matches!(record.status, PaymentStatus::Captured | PaymentStatus::Failed) {
                return Err(AppError::CapturedFundsHeld(format!(
                    "Job '{}' has a payment record in status '{}'; an admin refund must happen before cancellation",
                    job_id, record.status
                )));
            }
        }

        self.jobs
            .transition_status(job_id, job.status, JobStatus::Cancelled)
            .await?;

        tracing::info!(job_id = %job_id, actor_id = %actor_id, "Job cancelled");

        self.jobs.get(job_id).await
    }

    /// Fetch a job
    pub async fn get_job(&self, job_id: &str) -> Result<JobRequest> {
        self.jobs.get(job_id).await
    }

    /// Fetch a job with its quote and ledger record
    pub async fn get_job_detail(&self, job_id: &str) -> Result<JobDetail> {
        let job = self.jobs.get(job_id).await?;
        let quote = self.quotes.find_by_job_id(job_id).await?;
        let payment = self.payments.find_by_job_id(job_id).await?;

        Ok(JobDetail {
            job,
            quote,
            payment,
        })
    }

    /// List jobs matching the filter
    pub async fn get_history(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRequest>> {
        self.jobs.list(filter).await
    }

    /// Shared plain-transition path for side-effect-free edges
    async fn transition(&self, job_id: &str, target: JobStatus) -> Result<JobRequest> {
        let job = self.jobs.get(job_id).await?;
        job.status.ensure_transition(target)?;

        self.jobs.transition_status(job_id, job.status, target).await?;

        tracing::info!(
            job_id = %job_id,
            from = %job.status,
            to = %target,
            "Job transitioned"
        );

        self.jobs.get(job_id).await
    }

    fn ensure_homeowner(&self, job: &JobRequest, actor_id: &str) -> Result<()> {
        if job.homeowner_id != actor_id {
            return Err(AppError::forbidden(format!(
                "Actor '{}' is not the homeowner on job '{}'",
                actor_id,
                job.get_id().unwrap_or("?")
            )));
        }
        Ok(())
    }

    fn ensure_provider(&self, job: &JobRequest, actor_id: &str) -> Result<()> {
        if job.provider_id.as_deref() != Some(actor_id) {
            return Err(AppError::forbidden(format!(
                "Actor '{}' is not the assigned provider on job '{}'",
                actor_id,
                job.get_id().unwrap_or("?")
            )));
        }
        Ok(())
    }

    fn ensure_party(&self, job: &JobRequest, actor_id: &str) -> Result<()> {
        if job.homeowner_id == actor_id || job.provider_id.as_deref() == Some(actor_id) {
            return Ok(());
        }
        Err(AppError::forbidden(format!(
            "Actor '{}' is not a party to job '{}'",
            actor_id,
            job.get_id().unwrap_or("?")
        )))
    }
}
