//! Decimal normalization for on-chain integer amounts.

use alloy_primitives::utils::format_units;
use alloy_primitives::U256;

/// Decimal exponent of the native currency and of the price feed.
pub const NATIVE_DECIMALS: u8 = 18;

/// Divide a raw on-chain integer by `10^decimals`.
///
/// Goes through the exact decimal string so values above `2^53` keep their
/// leading digits.
pub fn to_decimal_units(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_and_a_half_ether() {
        let raw = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(to_decimal_units(raw, NATIVE_DECIMALS), 1.5);
    }

    #[test]
    fn test_zero() {
        assert_eq!(to_decimal_units(U256::ZERO, NATIVE_DECIMALS), 0.0);
    }

    #[test]
    fn test_sub_unit_amount() {
        let raw = U256::from(1_000u64);
        assert_eq!(to_decimal_units(raw, 3), 1.0);
        assert_eq!(to_decimal_units(U256::from(1u64), NATIVE_DECIMALS), 1e-18);
    }

    #[test]
    fn test_large_supply() {
        // 1 billion tokens with 18 decimals
        let raw = U256::from(10u64).pow(U256::from(27u64));
        assert_eq!(to_decimal_units(raw, NATIVE_DECIMALS), 1e9);
    }
}
