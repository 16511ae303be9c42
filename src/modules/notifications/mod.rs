// Notifications module: fire-and-forget event dispatch

pub mod services;

pub use services::{NotificationEvent, Notifier};
