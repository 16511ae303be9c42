// Admin module: audited overrides that bypass normal transition gating

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{AdminAction, AuditEntry};
pub use repositories::AuditRepository;
pub use services::{AdminService, RefundTarget, SettlementState};
