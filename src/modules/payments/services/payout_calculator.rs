use rust_decimal::Decimal;

use crate::core::money;

/// Platform share of captured funds (15%)
pub const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// The platform/provider split of a captured total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    pub platform_fee: Decimal,
    pub provider_payout: Decimal,
}

/// Split a captured total between platform and provider.
///
/// Pure function, no I/O. The fee is rounded to cents and the payout is the
/// exact remainder, so `platform_fee + provider_payout` always reconstructs
/// the input total. Called once per settlement event; the result is persisted
/// together with the ledger update, never recomputed out of band.
pub fn split(total_captured: Decimal) -> PayoutSplit {
    let platform_fee = money::round_usd(total_captured * PLATFORM_FEE_RATE);
    let provider_payout = total_captured - platform_fee;

    PayoutSplit {
        platform_fee,
        provider_payout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fee_rate_constant() {
        assert_eq!(PLATFORM_FEE_RATE, dec("0.15"));
    }

    #[test]
    fn test_diagnostic_fee_split() {
        let result = split(dec("85.00"));
        assert_eq!(result.platform_fee, dec("12.75"));
        assert_eq!(result.provider_payout, dec("72.25"));
    }

    #[test]
    fn test_diagnostic_plus_repair_split() {
        // $85 diagnostic + $350 repair
        let result = split(dec("435.00"));
        assert_eq!(result.platform_fee, dec("65.25"));
        assert_eq!(result.provider_payout, dec("369.75"));
    }

    #[test]
    fn test_split_reconstructs_total_with_awkward_cents() {
        let total = dec("99.99");
        let result = split(total);
        assert_eq!(result.platform_fee + result.provider_payout, total);
        assert_eq!(result.platform_fee, dec("15.00"));
    }

    #[test]
    fn test_zero_total() {
        let result = split(Decimal::ZERO);
        assert_eq!(result.platform_fee, Decimal::ZERO);
        assert_eq!(result.provider_payout, Decimal::ZERO);
    }
}
