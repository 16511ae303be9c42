pub mod repair_quote;

pub use repair_quote::{QuoteStatus, RepairQuote};
