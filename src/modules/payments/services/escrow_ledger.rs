use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{money, AppError, Result};
use crate::modules::payments::models::HoldPurpose;
use crate::modules::payments::services::gateway_trait::{
    CreateHoldRequest, GatewayHold, PaymentGateway,
};

/// Receipt for a refund issued through the ledger
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub reference: String,
    pub amount: Decimal,
}

/// All gateway interaction goes through here, normalized into three
/// idempotent operations: place, capture, refund.
///
/// The ledger never mutates jobs or payment records; it reports what the
/// money actually did and callers decide what persisted state follows.
/// That separation is what keeps reconciliation after a partial failure
/// tractable.
pub struct EscrowLedger {
    gateway: Arc<dyn PaymentGateway>,
}

impl EscrowLedger {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Authorize a hold for a job.
    ///
    /// The idempotency key is derived from the job and purpose, so a retried
    /// booking or approval reuses the same gateway-side hold instead of
    /// authorizing twice.
    pub async fn place_hold(
        &self,
        job_id: &str,
        purpose: HoldPurpose,
        amount: Decimal,
        payment_method: Option<String>,
    ) -> Result<String> {
        money::validate_amount("Hold amount", amount)?;
        let amount_minor = money::to_minor_units(amount)?;

        let mut metadata = HashMap::new();
        metadata.insert("job_id".to_string(), job_id.to_string());
        metadata.insert("purpose".to_string(), purpose.to_string());

        let hold = self
            .gateway
            .create_hold(CreateHoldRequest {
                amount_minor,
                currency: "usd".to_string(),
                idempotency_key: hold_idempotency_key(job_id, purpose),
                metadata,
                payment_method,
            })
            .await?;

        tracing::info!(
            job_id = %job_id,
            purpose = %purpose,
            hold_ref = %hold.reference,
            amount = %amount,
            gateway = self.gateway.name(),
            "Hold placed"
        );

        Ok(hold.reference)
    }

    /// Capture a hold, returning the captured amount.
    ///
    /// The remote state is queried first: an already-captured hold returns
    /// the previously captured amount without re-invoking capture, so two
    /// racing captures (user completion vs admin force-complete) both
    /// observe success and exactly one charge happens.
    pub async fn capture(&self, hold_ref: &str) -> Result<Decimal> {
        let hold = self.gateway.get_hold(hold_ref).await?;

        if hold.state == super::gateway_trait::HoldState::Captured {
            tracing::info!(
                hold_ref = %hold_ref,
                captured_minor = hold.captured_minor,
                "Hold already captured, returning prior amount"
            );
            return Ok(money::from_minor_units(hold.captured_minor));
        }

        if !hold.state.is_capturable() {
            return Err(AppError::HoldNotCapturable(format!(
                "Hold '{}' is in state '{:?}' and cannot be captured",
                hold_ref, hold.state
            )));
        }

        let captured: GatewayHold = match self.gateway.capture_hold(hold_ref).await {
            Ok(captured) => captured,
            Err(e) => {
                // Two requests can race to capture the same hold (a user
                // completion and an admin force-complete firing together).
                // The loser re-reads remote state and treats a hold someone
                // else captured as its own success.
                let current = self.gateway.get_hold(hold_ref).await?;
                if current.state == super::gateway_trait::HoldState::Captured {
                    tracing::info!(
                        hold_ref = %hold_ref,
                        captured_minor = current.captured_minor,
                        "Lost capture race, hold already captured"
                    );
                    return Ok(money::from_minor_units(current.captured_minor));
                }
                return Err(e);
            }
        };

        tracing::info!(
            hold_ref = %hold_ref,
            captured_minor = captured.captured_minor,
            gateway = self.gateway.name(),
            "Hold captured"
        );

        Ok(money::from_minor_units(captured.captured_minor))
    }

    /// Current remote state of a hold, for callers that must pre-check
    /// before deciding which typed error a bad request deserves
    pub async fn hold_state(&self, hold_ref: &str) -> Result<super::gateway_trait::HoldState> {
        Ok(self.gateway.get_hold(hold_ref).await?.state)
    }

    /// Refund a captured hold, partially when `amount` is given.
    ///
    /// A hold that was never captured has nothing to return and is rejected;
    /// voiding an uncaptured authorization is not a refund.
    pub async fn refund(&self, hold_ref: &str, amount: Option<Decimal>) -> Result<RefundReceipt> {
        let hold = self.gateway.get_hold(hold_ref).await?;

        if hold.state != super::gateway_trait::HoldState::Captured {
            return Err(AppError::RefundRejected(format!(
                "Hold '{}' was never captured (state '{:?}')",
                hold_ref, hold.state
            )));
        }

        let amount_minor = match amount {
            Some(amount) => {
                money::validate_amount("Refund amount", amount)?;
                let minor = money::to_minor_units(amount)?;
                if minor > hold.captured_minor {
                    return Err(AppError::RefundRejected(format!(
                        "Refund of {} exceeds captured amount on hold '{}'",
                        amount, hold_ref
                    )));
                }
                Some(minor)
            }
            None => None,
        };

        let refund = self.gateway.refund_hold(hold_ref, amount_minor).await?;

        tracing::info!(
            hold_ref = %hold_ref,
            refund_ref = %refund.reference,
            amount_minor = refund.amount_minor,
            gateway = self.gateway.name(),
            "Refund issued"
        );

        Ok(RefundReceipt {
            reference: refund.reference,
            amount: money::from_minor_units(refund.amount_minor),
        })
    }
}

/// Stable per-(job, purpose) key so gateway-side dedup absorbs retries
fn hold_idempotency_key(job_id: &str, purpose: HoldPurpose) -> String {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_bytes());
    hasher.update(b":");
    hasher.update(purpose.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key_is_stable_and_purpose_scoped() {
        let a = hold_idempotency_key("job-1", HoldPurpose::Diagnostic);
        let b = hold_idempotency_key("job-1", HoldPurpose::Diagnostic);
        let c = hold_idempotency_key("job-1", HoldPurpose::Repair);
        let d = hold_idempotency_key("job-2", HoldPurpose::Diagnostic);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.len(), 64);
    }
}
