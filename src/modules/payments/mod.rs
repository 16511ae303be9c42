// Payments module: escrow ledger, payout split, gateway clients

pub mod models;
pub mod repositories;
pub mod services;

pub use models::{HoldPurpose, PaymentRecord, PaymentStatus, RefundEntry};
pub use repositories::PaymentRepository;
pub use services::{EscrowLedger, PaymentGateway, StripeGateway};
