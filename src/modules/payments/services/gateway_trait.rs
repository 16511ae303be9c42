use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::Result;

/// Remote lifecycle state of a hold as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldState {
    /// Authorized, waiting for capture
    RequiresCapture,
    /// Funds captured
    Captured,
    /// Voided before capture
    Canceled,
    /// Authorization lapsed without capture
    Expired,
}

impl HoldState {
    pub fn is_capturable(&self) -> bool {
        matches!(self, HoldState::RequiresCapture)
    }
}

/// Request to authorize (not charge) an amount
#[derive(Debug, Clone)]
pub struct CreateHoldRequest {
    /// Amount in integer minor currency units (cents)
    pub amount_minor: i64,

    /// ISO currency code, lowercase
    pub currency: String,

    /// Gateway-side dedup key; retries of the same logical hold reuse it
    pub idempotency_key: String,

    /// Opaque tags stored on the gateway object (job id, hold purpose)
    pub metadata: HashMap<String, String>,

    /// Payment method authorization supplied by the payer
    pub payment_method: Option<String>,
}

/// A hold as the gateway sees it
#[derive(Debug, Clone)]
pub struct GatewayHold {
    /// Gateway reference for the hold
    pub reference: String,

    pub state: HoldState,

    /// Authorized amount in minor units
    pub amount_minor: i64,

    /// Captured amount in minor units; zero until captured
    pub captured_minor: i64,
}

/// A refund issued against a captured hold
#[derive(Debug, Clone)]
pub struct GatewayRefund {
    /// Gateway reference for the refund
    pub reference: String,

    /// Refunded amount in minor units
    pub amount_minor: i64,
}

/// Payment gateway abstraction for the authorize/capture escrow flow
///
/// Implementations translate transport failures into `GatewayUnavailable`
/// and gateway declines into `GatewayRejected`; callers rely on that split
/// to decide retryability.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize a hold; no funds move until capture
    async fn create_hold(&self, request: CreateHoldRequest) -> Result<GatewayHold>;

    /// Fetch current remote state of a hold
    async fn get_hold(&self, hold_ref: &str) -> Result<GatewayHold>;

    /// Capture a hold that is in a capturable state
    async fn capture_hold(&self, hold_ref: &str) -> Result<GatewayHold>;

    /// Refund a captured hold, partially when `amount_minor` is given
    async fn refund_hold(&self, hold_ref: &str, amount_minor: Option<i64>)
        -> Result<GatewayRefund>;

    /// Gateway name for logging
    fn name(&self) -> &str;
}
