//! Type coercion helpers
//!
//! Sheet values are untyped strings, so every numeric comparison goes
//! through an explicit try-parse step. A value that fails to parse is
//! absent for numeric purposes, never zero.

/// Try to read a string as a number.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Loose equality between a field value and a filter value.
///
/// Equal when the string forms match, or when both sides parse as the same
/// number (the text "1" equals the number 1). A null field value never
/// equals anything.
pub fn loose_eq(field: Option<&str>, filter: &str) -> bool {
    let Some(field) = field else {
        return false;
    };
    if field == filter {
        return true;
    }
    match (parse_number(field), parse_number(filter)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
