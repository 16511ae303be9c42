// Providers module

pub mod models;
pub mod repositories;

pub use models::ServiceProvider;
pub use repositories::ProviderRepository;
