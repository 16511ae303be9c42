// Quotes module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{QuoteStatus, RepairQuote};
pub use repositories::QuoteRepository;
pub use services::QuoteService;
