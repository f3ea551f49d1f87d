//! Number and time formatting for the console display.

use chrono::NaiveDateTime;

/// `1554362` -> `"1,554,362"`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn clock(instant: NaiveDateTime) -> String {
    instant.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parses `#RRGGBB` into its channels.
pub fn rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(1_554_362), "1,554,362");
        assert_eq!(thousands(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn colors() {
        assert_eq!(rgb("#FF6F61"), Some((0xFF, 0x6F, 0x61)));
        assert_eq!(rgb("FF6F61"), None);
        assert_eq!(rgb("#GG0000"), None);
    }
}
