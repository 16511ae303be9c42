pub mod admin_service;

pub use admin_service::{
    AdminService, HoldOutcome, HoldResult, RefundOutcome, RefundTarget, SettlementOutcome,
    SettlementState,
};
