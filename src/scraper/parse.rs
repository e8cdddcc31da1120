//! Count-text normalization for dashboard stat cells.
//!
//! The dashboard renders counters in several locale-dependent shapes
//! ("1,234", "1.2k", "3m"). Everything funnels through [`parse_count`],
//! which always yields a usable number.

/// Parse a raw counter string into a count.
///
/// Recognizes a `k`/`m` magnitude suffix (case-insensitive) and strips
/// thousands separators. Truncates toward zero after applying the
/// multiplier. Anything unparseable yields 0 rather than an error so a
/// noisy cell never poisons a whole row.
pub fn parse_count(text: &str) -> u64 {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return 0;
    }

    let (text, multiplier) = if text.contains('k') {
        (text.replace('k', ""), 1_000.0)
    } else if text.contains('m') {
        (text.replace('m', ""), 1_000_000.0)
    } else {
        (text, 1.0)
    };

    match text.replace(',', "").trim().parse::<f64>() {
        // `as u64` saturates: negatives and NaN become 0, fractions truncate.
        Ok(value) => (value * multiplier) as u64,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("   "), 0);
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("42"), 42);
        assert_eq!(parse_count(" 7 "), 7);
    }

    #[test]
    fn thousands_separators_are_stripped() {
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("12,345,678"), 12_345_678);
    }

    #[test]
    fn magnitude_suffixes() {
        assert_eq!(parse_count("1.2k"), 1200);
        assert_eq!(parse_count("3m"), 3_000_000);
        assert_eq!(parse_count("1.5M"), 1_500_000);
        assert_eq!(parse_count("2 k"), 2000);
    }

    #[test]
    fn fractional_results_truncate_toward_zero() {
        assert_eq!(parse_count("1.9"), 1);
        assert_eq!(parse_count("0.4k"), 400);
        assert_eq!(parse_count("1.2345k"), 1234);
    }

    #[test]
    fn garbage_is_zero() {
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count("1.2.3"), 0);
        assert_eq!(parse_count("k"), 0);
    }

    #[test]
    fn negative_input_never_goes_below_zero() {
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("-1.2k"), 0);
    }
}
