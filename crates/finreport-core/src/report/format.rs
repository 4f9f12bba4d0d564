use rust_decimal::{Decimal, RoundingStrategy};

/// Format a decimal with a fixed number of decimal places and comma thousands
/// separators, e.g. `2847` -> `2,847`, `2.61` -> `2.61`.
///
/// Callers are expected to have checked that `value` is representable at
/// `decimals` places; the result is then the exact literal of the value.
pub fn format_grouped(value: Decimal, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value);
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format a percentage rounded half away from zero to `decimals` places.
pub fn format_percent(value: Decimal, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format_grouped(rounded, decimals)
}

/// Format an inclusive range using an en dash: `3,300–3,500`.
pub fn format_range(low: Decimal, high: Decimal, decimals: u32) -> String {
    format!(
        "{}\u{2013}{}",
        format_grouped(low, decimals),
        format_grouped(high, decimals)
    )
}

/// True when `value` survives display at `decimals` places without rounding.
pub fn is_exact_at(value: Decimal, decimals: u32) -> bool {
    value.round_dp(decimals) == value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_grouping() {
        assert_eq!(format_grouped(dec!(2847), 0), "2,847");
        assert_eq!(format_grouped(dec!(10552), 0), "10,552");
        assert_eq!(format_grouped(dec!(342), 0), "342");
        assert_eq!(format_grouped(dec!(1234567), 0), "1,234,567");
        assert_eq!(format_grouped(dec!(-4500), 0), "-4,500");
    }

    #[test]
    fn test_fixed_decimals_keep_trailing_zeros() {
        assert_eq!(format_grouped(dec!(2.61), 2), "2.61");
        assert_eq!(format_grouped(dec!(8.4), 2), "8.40");
        assert_eq!(format_grouped(dec!(1234.5), 2), "1,234.50");
    }

    #[test]
    fn test_percent_rounds_half_away_from_zero() {
        // 67 / 389 = 0.172236...
        let pct = dec!(67) / dec!(389) * dec!(100);
        assert_eq!(format_percent(pct, 1), "17.2");
        assert_eq!(format_percent(dec!(2.25), 1), "2.3");
        assert_eq!(format_percent(dec!(-2.25), 1), "-2.3");
    }

    #[test]
    fn test_range_uses_en_dash() {
        assert_eq!(format_range(dec!(3300), dec!(3500), 0), "3,300–3,500");
    }

    #[test]
    fn test_exactness() {
        assert!(is_exact_at(dec!(2.61), 2));
        assert!(is_exact_at(dec!(2847), 0));
        assert!(!is_exact_at(dec!(2.615), 2));
        assert!(!is_exact_at(dec!(2847.5), 0));
    }
}
