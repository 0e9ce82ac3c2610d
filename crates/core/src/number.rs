use rust_decimal::Decimal;
use std::str::FromStr;

/// Strict parse of a Finnish-formatted number such as `"65 851,63"`.
///
/// Any whitespace (including no-break spaces used as thousands separators)
/// is removed and the decimal comma becomes a period. Returns `None` for
/// empty or malformed input.
pub fn try_parse_finnish_number(text: &str) -> Option<Decimal> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Lenient variant of [`try_parse_finnish_number`]: malformed input is `0`.
pub fn parse_finnish_number(text: &str) -> Decimal {
    try_parse_finnish_number(text).unwrap_or(Decimal::ZERO)
}
