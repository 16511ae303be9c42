// Jobs module: the lifecycle state machine and its orchestration

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{JobRequest, JobStatus};
pub use repositories::{JobHistoryFilter, JobRepository};
pub use services::{JobDetail, JobService, TriageOutcome};
