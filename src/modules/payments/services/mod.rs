pub mod escrow_ledger;
pub mod gateway_trait;
pub mod payout_calculator;
pub mod stripe;

pub use escrow_ledger::{EscrowLedger, RefundReceipt};
pub use gateway_trait::{
    CreateHoldRequest, GatewayHold, GatewayRefund, HoldState, PaymentGateway,
};
pub use stripe::StripeGateway;
