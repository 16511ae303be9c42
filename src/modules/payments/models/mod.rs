pub mod payment_record;

pub use payment_record::{HoldPurpose, PaymentRecord, PaymentStatus, RefundEntry};
