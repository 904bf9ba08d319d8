use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::core::error::{AppError, Result};

lazy_static! {
    /// Shape of an external inspector access token: 32 lowercase hex characters
    pub static ref ACCESS_TOKEN_REGEX: Regex = Regex::new(r"^[0-9a-f]{32}$").unwrap();

    /// Whitespace runs collapsed when normalising room and item names
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalise a room or item name for alignment: trimmed, single-spaced, lowercase
pub fn normalize_name(name: &str) -> String {
    WHITESPACE_RE
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Resolve a scheduled date given as `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d/%m/%Y") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }
    Err(AppError::Validation(format!(
        "'{}' is not a calendar date",
        input
    )))
}

/// Reject empty or whitespace-only required text
pub fn require_text(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_regex() {
        assert!(ACCESS_TOKEN_REGEX.is_match("0123456789abcdef0123456789abcdef"));
        assert!(!ACCESS_TOKEN_REGEX.is_match("0123456789ABCDEF0123456789ABCDEF"));
        assert!(!ACCESS_TOKEN_REGEX.is_match("0123456789abcdef"));
        assert!(!ACCESS_TOKEN_REGEX.is_match("g123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Main  Bedroom "), "main bedroom");
        assert_eq!(normalize_name("KITCHEN"), "kitchen");
    }

    #[test]
    fn test_parse_calendar_date() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(parse_calendar_date("2026-03-14").unwrap(), expected);
        assert_eq!(parse_calendar_date("14/03/2026").unwrap(), expected);
        assert_eq!(
            parse_calendar_date("2026-03-14T09:30:00+10:00").unwrap(),
            expected
        );
        assert!(matches!(
            parse_calendar_date("next tuesday"),
            Err(AppError::Validation(_))
        ));
        assert!(parse_calendar_date("2026-02-30").is_err());
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("reason", "  busy ").unwrap(), "busy");
        assert!(require_text("reason", "   ").is_err());
    }
}
