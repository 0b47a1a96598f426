use bigdecimal::BigDecimal;
use common_money::{format_amount, normalize_scale};
use proptest::prelude::*;
use std::str::FromStr;

proptest! {
    // Whole-cent inputs must pass through unchanged apart from padding.
    #[test]
    fn whole_cents_are_stable(cents in -1_000_000i64..1_000_000) {
        let sign = if cents < 0 { "-" } else { "" };
        let abs = cents.unsigned_abs();
        let text = format!("{sign}{}.{:02}", abs / 100, abs % 100);
        let bd = BigDecimal::from_str(&text).unwrap();
        prop_assert_eq!(format_amount(&bd), text);
    }

    // Output always has exactly two fractional digits and no exponent.
    #[test]
    fn always_two_fraction_digits(major in 0u32..10_000_000, frac in 0u32..1_000_000) {
        let bd = BigDecimal::from_str(&format!("{major}.{frac:06}")).unwrap();
        let out = format_amount(&bd);
        let (_, fraction) = out.split_once('.').expect("decimal point");
        prop_assert_eq!(fraction.len(), 2);
        prop_assert!(!out.contains('e') && !out.contains('E'));
    }

    // A thousandth digit of 5 or more rounds up (away from zero), below 5 truncates.
    #[test]
    fn half_away_from_zero(base_cents in 0i64..100_000, thousandth in 0u8..10) {
        let text = format!("{}.{:02}{}", base_cents / 100, base_cents % 100, thousandth);
        let bd = BigDecimal::from_str(&text).unwrap();
        let expected_cents = if thousandth >= 5 { base_cents + 1 } else { base_cents };
        let expected = format!("{}.{:02}", expected_cents / 100, expected_cents % 100);
        prop_assert_eq!(normalize_scale(&bd).to_string(), expected.clone());

        let negative = BigDecimal::from_str(&format!("-{text}")).unwrap();
        if expected_cents != 0 {
            prop_assert_eq!(format_amount(&negative), format!("-{expected}"));
        }
    }
}
