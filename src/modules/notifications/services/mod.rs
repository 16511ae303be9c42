pub mod dispatcher;

pub use dispatcher::{NotificationEvent, Notifier};
