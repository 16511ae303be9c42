// Property-based tests for the platform/provider payout split.
//
// The split must reconstruct the captured total exactly for any amount, with
// the platform fee rounded to cents at 15%.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use homefix::modules::payments::services::payout_calculator::{split, PLATFORM_FEE_RATE};

#[test]
fn test_fixed_scenarios() {
    // Diagnostic fee alone
    let result = split(dec!(85.00));
    assert_eq!(result.platform_fee, dec!(12.75));
    assert_eq!(result.provider_payout, dec!(72.25));

    // Diagnostic ($85) + approved repair quote ($200 labor + $150 parts)
    let result = split(dec!(435.00));
    assert_eq!(result.platform_fee, dec!(65.25));
    assert_eq!(result.provider_payout, dec!(369.75));
}

#[test]
fn test_rate_is_fifteen_percent() {
    assert_eq!(PLATFORM_FEE_RATE, dec!(0.15));
}

proptest! {
    /// fee + payout == total for every representable USD amount
    #[test]
    fn test_split_reconstructs_total(total_cents in 1i64..100_000_000i64) {
        let total = Decimal::new(total_cents, 2);
        let result = split(total);

        prop_assert_eq!(result.platform_fee + result.provider_payout, total);
    }

    /// The fee is exactly round(total * 0.15, 2)
    #[test]
    fn test_fee_is_rounded_fifteen_percent(total_cents in 1i64..100_000_000i64) {
        let total = Decimal::new(total_cents, 2);
        let result = split(total);

        prop_assert_eq!(result.platform_fee, (total * dec!(0.15)).round_dp(2));
    }

    /// Splitting is deterministic: same input, same output (the idempotent
    /// rounding law a recompute-from-source ledger relies on)
    #[test]
    fn test_split_is_deterministic(total_cents in 1i64..100_000_000i64) {
        let total = Decimal::new(total_cents, 2);

        let first = split(total);
        let second = split(total);

        prop_assert_eq!(first.platform_fee, second.platform_fee);
        prop_assert_eq!(first.provider_payout, second.provider_payout);
    }

    /// Both shares stay within [0, total] and carry cent precision
    #[test]
    fn test_shares_are_well_formed(total_cents in 1i64..100_000_000i64) {
        let total = Decimal::new(total_cents, 2);
        let result = split(total);

        prop_assert!(result.platform_fee >= Decimal::ZERO);
        prop_assert!(result.provider_payout >= Decimal::ZERO);
        prop_assert!(result.platform_fee <= total);
        prop_assert!(result.platform_fee.scale() <= 2);
        prop_assert!(result.provider_payout.scale() <= 2);
    }
}
