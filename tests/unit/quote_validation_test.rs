// Property-based tests for repair quote validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use homefix::modules::quotes::models::{QuoteStatus, RepairQuote};

fn quote(labor: Decimal, parts: Decimal) -> homefix::core::Result<RepairQuote> {
    RepairQuote::new(
        "job-1".to_string(),
        "provider-1".to_string(),
        labor,
        parts,
        None,
    )
}

#[test]
fn test_zero_total_rejected() {
    assert!(quote(dec!(0), dec!(0)).is_err());
}

#[test]
fn test_negative_components_rejected() {
    assert!(quote(dec!(-1.00), dec!(10.00)).is_err());
    assert!(quote(dec!(10.00), dec!(-1.00)).is_err());
}

#[test]
fn test_sub_cent_precision_rejected() {
    assert!(quote(dec!(10.005), dec!(5.00)).is_err());
}

#[test]
fn test_decline_then_approve_is_rejected() {
    let mut q = quote(dec!(200.00), dec!(150.00)).unwrap();
    q.decline(Some("going with someone else".to_string()))
        .unwrap();

    assert_eq!(q.status, QuoteStatus::Declined);
    assert!(q.approve().is_err(), "declined quotes are immutable");
}

proptest! {
    /// total_amount always equals labor + parts
    #[test]
    fn test_total_is_sum(
        labor_cents in 0i64..10_000_000i64,
        parts_cents in 0i64..10_000_000i64
    ) {
        let labor = Decimal::new(labor_cents, 2);
        let parts = Decimal::new(parts_cents, 2);

        match quote(labor, parts) {
            Ok(q) => {
                prop_assert_eq!(q.total_amount, labor + parts);
                prop_assert!(q.total_amount > Decimal::ZERO);
                prop_assert_eq!(q.status, QuoteStatus::Pending);
            }
            Err(_) => {
                // Only the all-zero quote is invalid in this range
                prop_assert_eq!(labor + parts, Decimal::ZERO);
            }
        }
    }

    /// A pending quote can be decided exactly once
    #[test]
    fn test_single_decision(
        labor_cents in 1i64..1_000_000i64,
        approve_first in any::<bool>()
    ) {
        let mut q = quote(Decimal::new(labor_cents, 2), Decimal::ZERO).unwrap();

        if approve_first {
            prop_assert!(q.approve().is_ok());
        } else {
            prop_assert!(q.decline(None).is_ok());
        }

        prop_assert!(q.approve().is_err());
        prop_assert!(q.decline(None).is_err());
    }
}
