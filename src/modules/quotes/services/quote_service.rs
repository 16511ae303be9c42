use rust_decimal::Decimal;
use std::sync::Arc;

use crate::core::{AppError, Result};
use crate::modules::jobs::models::{JobRequest, JobStatus};
use crate::modules::jobs::repositories::JobRepository;
use crate::modules::notifications::{NotificationEvent, Notifier};
use crate::modules::payments::models::HoldPurpose;
use crate::modules::payments::services::EscrowLedger;
use crate::modules::quotes::models::RepairQuote;
use crate::modules::quotes::repositories::QuoteRepository;

/// Quote orchestration: submission after diagnosis, approval with the
/// repair hold, decline.
///
/// Approval follows the same money-first ordering as the rest of the
/// lifecycle: the repair hold is authorized before the quote is marked
/// approved, and a declined hold leaves the quote pending.
pub struct QuoteService {
    quotes: QuoteRepository,
    jobs: JobRepository,
    escrow: Arc<EscrowLedger>,
    notifier: Arc<Notifier>,
}

impl QuoteService {
    pub fn new(
        quotes: QuoteRepository,
        jobs: JobRepository,
        escrow: Arc<EscrowLedger>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            quotes,
            jobs,
            escrow,
            notifier,
        }
    }

    /// Submit a quote for a job that finished its on-site diagnosis
    pub async fn submit_quote(
        &self,
        job_id: &str,
        provider_id: &str,
        labor_cost: Decimal,
        parts_cost: Decimal,
        notes: Option<String>,
    ) -> Result<RepairQuote> {
        let job = self.jobs.get(job_id).await?;

        if job.provider_id.as_deref() != Some(provider_id) {
            return Err(AppError::forbidden(format!(
                "Actor '{}' is not the assigned provider on job '{}'",
                provider_id, job_id
            )));
        }

        ensure_diagnosis_complete(&job)?;

        if self.quotes.find_by_job_id(job_id).await?.is_some() {
            return Err(AppError::DuplicateQuote(format!(
                "Job '{}' already has a quote",
                job_id
            )));
        }

        let quote = RepairQuote::new(
            job_id.to_string(),
            provider_id.to_string(),
            labor_cost,
            parts_cost,
            notes,
        )?;

        // Unique index on job_id backstops the existence check under races
        let quote = self.quotes.create(&quote).await?;

        tracing::info!(
            job_id = %job_id,
            quote_id = quote.id.as_deref().unwrap_or("?"),
            total_amount = %quote.total_amount,
            "Quote submitted"
        );

        self.notifier.notify(NotificationEvent::QuoteReady {
            job_id: job_id.to_string(),
            quote_id: quote.id.clone().unwrap_or_default(),
            total_amount: quote.total_amount,
        });

        Ok(quote)
    }

    /// Approve a quote: authorize the repair hold for the quoted total, then
    /// mark the quote approved.
    ///
    /// A repair hold presumes a diagnostic hold: a job can only carry one if
    /// the diagnostic visit was booked and paid for first.
    pub async fn approve_quote(
        &self,
        quote_id: &str,
        homeowner_id: &str,
        payment_method: Option<String>,
    ) -> Result<RepairQuote> {
        let mut quote = self.quotes.get(quote_id).await?;
        let job = self.jobs.get(&quote.job_id).await?;

        if job.homeowner_id != homeowner_id {
            return Err(AppError::forbidden(format!(
                "Actor '{}' is not the homeowner on job '{}'",
                homeowner_id, quote.job_id
            )));
        }

        if !quote.is_pending() {
            return Err(AppError::validation(format!(
                "Quote '{}' is '{}' and can no longer be approved",
                quote_id, quote.status
            )));
        }

        if job.diagnostic_hold_ref.is_none() {
            return Err(AppError::validation(format!(
                "Job '{}' has no diagnostic hold; a repair hold cannot be the first hold",
                quote.job_id
            )));
        }

        let hold_ref = self
            .escrow
            .place_hold(
                &quote.job_id,
                HoldPurpose::Repair,
                quote.total_amount,
                payment_method,
            )
            .await?;

        // Idempotency at the gateway means a retried approval reuses the
        // same hold; only a genuinely different ref is a conflict
        match job.repair_hold_ref.as_deref() {
            None => self.jobs.set_repair_hold(&quote.job_id, &hold_ref).await?,
            Some(existing) if existing == hold_ref => {}
            Some(existing) => {
                return Err(AppError::StaleJobState(format!(
                    "Job '{}' already carries repair hold '{}'",
                    quote.job_id, existing
                )));
            }
        }

        quote.approve()?;
        self.quotes.update_decision(&quote).await?;

        tracing::info!(
            job_id = %quote.job_id,
            quote_id = %quote_id,
            hold_ref = %hold_ref,
            total_amount = %quote.total_amount,
            "Quote approved, repair hold placed"
        );

        self.notifier.notify(NotificationEvent::QuoteApproved {
            job_id: quote.job_id.clone(),
            quote_id: quote_id.to_string(),
            total_amount: quote.total_amount,
        });

        Ok(quote)
    }

    /// Decline a quote; always legal while pending, no payment interaction
    pub async fn decline_quote(
        &self,
        quote_id: &str,
        homeowner_id: &str,
        reason: Option<String>,
    ) -> Result<RepairQuote> {
        let mut quote = self.quotes.get(quote_id).await?;
        let job = self.jobs.get(&quote.job_id).await?;

        if job.homeowner_id != homeowner_id {
            return Err(AppError::forbidden(format!(
                "Actor '{}' is not the homeowner on job '{}'",
                homeowner_id, quote.job_id
            )));
        }

        quote.decline(reason)?;
        self.quotes.update_decision(&quote).await?;

        tracing::info!(job_id = %quote.job_id, quote_id = %quote_id, "Quote declined");

        Ok(quote)
    }

    /// Fetch a quote
    pub async fn get_quote(&self, quote_id: &str) -> Result<RepairQuote> {
        self.quotes.get(quote_id).await
    }
}

/// Quotes are only accepted once the provider has been on site: after the
/// booked visit (`accepted`) or while the work is open (`in_progress`)
fn ensure_diagnosis_complete(job: &JobRequest) -> Result<()> {
    if matches!(job.status, JobStatus::Accepted | JobStatus::InProgress) {
        return Ok(());
    }
    Err(AppError::validation(format!(
        "Job '{}' is '{}'; quotes can only be submitted after the diagnostic visit is booked",
        job.get_id().unwrap_or("?"),
        job.status
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_with_status(status: JobStatus) -> JobRequest {
        let mut job = JobRequest::new(
            "owner-1".to_string(),
            "plumbing".to_string(),
            "Kitchen sink leaks under the trap".to_string(),
        )
        .unwrap();
        job.status = status;
        job
    }

    #[test]
    fn test_diagnosis_complete_statuses() {
        assert!(ensure_diagnosis_complete(&job_with_status(JobStatus::Accepted)).is_ok());
        assert!(ensure_diagnosis_complete(&job_with_status(JobStatus::InProgress)).is_ok());

        for status in [
            JobStatus::Submitted,
            JobStatus::AiDiagnosis,
            JobStatus::PendingMatch,
            JobStatus::Matched,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            assert!(
                ensure_diagnosis_complete(&job_with_status(status)).is_err(),
                "{} should reject quotes",
                status
            );
        }
    }
}
