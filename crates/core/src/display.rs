//! Presentation formatting. Output of these functions is never parsed back
//! or fed into accrual.

/// Whole GEM, rounded down: `61.77871` -> `"61"`.
pub fn format_gems(amount: f64) -> String {
    format!("{}", amount.floor() as i64)
}

/// Six decimals with thousands separators: `1234.5` -> `"1,234.500000"`.
pub fn format_usdt(amount: f64) -> String {
    let fixed = format!("{:.6}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "000000"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Countdown label: `18_189` -> `"05H 03M 09S"`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}H {minutes:02}M {secs:02}S")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gems_are_floored() {
        assert_eq!(format_gems(61.77871), "61");
        assert_eq!(format_gems(0.99), "0");
        assert_eq!(format_gems(100.0), "100");
    }

    #[test]
    fn usdt_has_six_decimals_and_grouping() {
        assert_eq!(format_usdt(0.1), "0.100000");
        assert_eq!(format_usdt(1234.5), "1,234.500000");
        assert_eq!(format_usdt(1_000_000.0), "1,000,000.000000");
        assert_eq!(format_usdt(-12.25), "-12.250000");
    }

    #[test]
    fn duration_is_zero_padded() {
        assert_eq!(format_duration(0), "00H 00M 00S");
        assert_eq!(format_duration(5 * 3600 + 3 * 60 + 9), "05H 03M 09S");
        assert_eq!(format_duration(24 * 3600), "24H 00M 00S");
    }
}
