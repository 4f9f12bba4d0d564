/// Chronological position of a fiscal period label.
///
/// Recognises `Q<n> <yyyy>` (quarters), `H<n> <yyyy>` (halves) and
/// `FY <yyyy>` / `FY<yyyy>` (full years). Returns the year and the
/// period's first month so labels of different granularity still order.
pub fn period_ordinal(label: &str) -> Option<(i32, u32)> {
    let label = label.trim();
    if let Some(rest) = label.strip_prefix("FY") {
        let year = rest.trim().parse::<i32>().ok()?;
        return Some((year, 1));
    }

    let (head, year) = label.split_once(' ')?;
    let year = year.trim().parse::<i32>().ok()?;
    let mut chars = head.chars();
    let kind = chars.next()?;
    let n: u32 = chars.as_str().parse().ok()?;
    match (kind, n) {
        ('Q', 1..=4) => Some((year, (n - 1) * 3 + 1)),
        ('H', 1..=2) => Some((year, (n - 1) * 6 + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_labels() {
        assert_eq!(period_ordinal("Q1 2024"), Some((2024, 1)));
        assert_eq!(period_ordinal("Q4 2024"), Some((2024, 10)));
        assert!(period_ordinal("Q4 2024") < period_ordinal("Q1 2025"));
    }

    #[test]
    fn test_half_and_full_year_labels() {
        assert_eq!(period_ordinal("H2 2023"), Some((2023, 7)));
        assert_eq!(period_ordinal("FY 2025"), Some((2025, 1)));
        assert_eq!(period_ordinal("FY2025"), Some((2025, 1)));
    }

    #[test]
    fn test_unrecognised_labels() {
        assert_eq!(period_ordinal("Q5 2024"), None);
        assert_eq!(period_ordinal("Spring"), None);
        assert_eq!(period_ordinal("Q1"), None);
    }
}
