//! Conversion between decimal ether strings and fixed-point wei amounts.

use alloy_primitives::U256;

use crate::error::EthError;

/// Number of decimals in one ether (1 ether = 10^18 wei).
pub const ETHER_DECIMALS: u8 = 18;

fn ten_pow(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Parses a non-negative decimal string into a fixed-point integer with
/// `decimals` fractional digits.
///
/// Fractional digits beyond `decimals` are truncated. Signs, exponents,
/// separators and surrounding garbage are rejected.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, EthError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(EthError::InvalidAmount("amount is empty".into()));
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(EthError::InvalidAmount(format!("no digits in {amount:?}")));
    }

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(EthError::InvalidAmount(format!(
            "{amount:?} is not a decimal number"
        )));
    }

    let decimals = decimals as usize;
    let fraction = &fraction[..fraction.len().min(decimals)];

    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    digits.push_str(fraction);
    digits.extend(std::iter::repeat('0').take(decimals - fraction.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10)
        .map_err(|e| EthError::InvalidAmount(format!("{amount:?} is out of range: {e}")))
}

/// Parses a decimal ether amount into wei.
pub fn parse_ether(amount: &str) -> Result<U256, EthError> {
    parse_units(amount, ETHER_DECIMALS)
}

/// Formats a fixed-point integer as a decimal string.
///
/// Trailing fractional zeros are dropped, but at least one fractional digit is
/// kept (`1000` with 3 decimals formats as `"1.0"`).
pub fn format_units(value: U256, decimals: u8) -> String {
    let base = ten_pow(decimals);
    let whole = value / base;
    let fraction = value % base;

    if fraction.is_zero() {
        return format!("{whole}.0");
    }

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{whole}.{}", padded.trim_end_matches('0'))
}

/// Formats a wei amount as a decimal ether string.
pub fn format_ether(value: U256) -> String {
    format_units(value, ETHER_DECIMALS)
}

/// Scales a wei amount down to ether as a floating-point number.
///
/// The exact decimal representation is rounded once to the nearest `f64`.
pub fn wei_to_ether(value: U256) -> f64 {
    format_ether(value).parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wei(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    #[test]
    fn parse_whole_ether() {
        assert_eq!(parse_ether("1").unwrap(), wei("1000000000000000000"));
        assert_eq!(parse_ether("0").unwrap(), U256::ZERO);
    }

    #[test]
    fn parse_fractional_ether() {
        assert_eq!(parse_ether("0.0001").unwrap(), wei("100000000000000"));
        assert_eq!(parse_ether("1.5").unwrap(), wei("1500000000000000000"));
        assert_eq!(parse_ether(".5").unwrap(), wei("500000000000000000"));
        assert_eq!(parse_ether("2.").unwrap(), wei("2000000000000000000"));
    }

    #[test]
    fn parse_smallest_unit() {
        assert_eq!(parse_ether("0.000000000000000001").unwrap(), U256::from(1u64));
    }

    #[test]
    fn parse_truncates_excess_fraction_digits() {
        assert_eq!(parse_ether("0.0000000000000000019").unwrap(), U256::from(1u64));
        assert_eq!(parse_ether("0.0000000000000000009").unwrap(), U256::ZERO);
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(parse_ether("  3 ").unwrap(), wei("3000000000000000000"));
    }

    #[test]
    fn parse_rejects_malformed_amounts() {
        for bad in ["", " ", ".", "-1", "+1", "1e18", "1.2.3", "abc", "1,5", "0x10"] {
            assert!(parse_ether(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(80);
        assert!(matches!(parse_ether(&huge), Err(EthError::InvalidAmount(_))));
    }

    #[test]
    fn format_ether_values() {
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(format_ether(wei("1000000000000000000")), "1.0");
        assert_eq!(format_ether(wei("1500000000000000000")), "1.5");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn format_units_with_other_decimals() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(1_230_000u64), 6), "1.23");
        assert_eq!(format_units(U256::from(7u64), 0), "7.0");
    }

    #[test]
    fn wei_to_ether_scales_down() {
        assert_eq!(wei_to_ether(wei("1500000000000000000")), 1.5);
        assert_eq!(wei_to_ether(wei("100000000000000")), 0.0001);
        assert_eq!(wei_to_ether(U256::ZERO), 0.0);
    }

    proptest! {
        #[test]
        fn parse_ether_is_scaled_integer(whole in 0u64..1_000_000_000, fraction in proptest::collection::vec(0u8..10, 0..=24)) {
            let fraction: String = fraction.iter().map(|d| char::from(b'0' + d)).collect();
            let input = format!("{whole}.{fraction}");

            let kept: String = fraction.chars().take(18).collect();
            let expected = U256::from(whole) * ten_pow(18)
                + U256::from_str_radix(&format!("{kept:0<18}"), 10).unwrap();

            prop_assert_eq!(parse_ether(&input).unwrap(), expected);
        }

        #[test]
        fn chain_amount_scales_to_quotient(amount in any::<u128>()) {
            let value = U256::from(amount);
            let expected = (amount as f64) / 1e18;
            let actual = wei_to_ether(value);
            let tolerance = expected.abs() * 1e-12 + f64::MIN_POSITIVE;
            prop_assert!((actual - expected).abs() <= tolerance);
        }

        #[test]
        fn format_then_parse_is_identity(amount in any::<u128>()) {
            let value = U256::from(amount);
            prop_assert_eq!(parse_ether(&format_ether(value)).unwrap(), value);
        }
    }
}
