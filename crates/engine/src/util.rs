//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use std::str::FromStr;

use chrono::NaiveDate;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a display name and require at least two characters.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() < 2 {
        return Err(EngineError::InvalidInput(format!(
            "{label} must be at least 2 characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Comparison key for case-insensitive uniqueness (NFKC + lowercase).
pub(crate) fn name_key(value: &str) -> String {
    value.trim().nfkc().collect::<String>().to_lowercase()
}

/// Validate a `#RRGGBB` color and return it unchanged.
pub(crate) fn ensure_color(value: &str) -> ResultEngine<String> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(EngineError::InvalidInput(format!(
            "invalid color '{value}': expected #RRGGBB"
        )));
    }
    Ok(value.to_string())
}

/// Lowercase and validate a `local@domain.tld` address.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let invalid = || EngineError::InvalidInput("invalid email address".to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(email),
        _ => Err(invalid()),
    }
}

pub(crate) fn ensure_timezone(value: &str) -> ResultEngine<String> {
    chrono_tz::Tz::from_str(value.trim())
        .map(|tz| tz.name().to_string())
        .map_err(|_| EngineError::InvalidInput(format!("unknown timezone: {value}")))
}

/// Largest money value accepted on input, in minor units. Keeps ledger
/// sums far away from `i64` overflow.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

pub(crate) fn ensure_positive_amount(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be greater than zero"
        )));
    }
    ensure_amount_in_range(amount_minor, label)
}

/// `|amount_minor| <= MAX_AMOUNT_MINOR`. Balances may be negative.
pub(crate) fn ensure_amount_in_range(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor.unsigned_abs() > MAX_AMOUNT_MINOR.unsigned_abs() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must be between -{MAX_AMOUNT_MINOR} and {MAX_AMOUNT_MINOR}"
        )));
    }
    Ok(())
}

pub(crate) fn amount_overflow(label: &str) -> EngineError {
    EngineError::InvalidAmount(format!("{label} is out of range"))
}

/// SQLite reports `SUM` overflow as a plain query error.
pub(crate) fn sum_overflow(err: sea_orm::DbErr) -> EngineError {
    if err.to_string().contains("integer overflow") {
        amount_overflow("ledger total")
    } else {
        EngineError::Database(err)
    }
}

pub(crate) fn ensure_date_order(
    start: NaiveDate,
    end: NaiveDate,
    start_label: &str,
    end_label: &str,
) -> ResultEngine<()> {
    if start > end {
        return Err(EngineError::InvalidDate(format!(
            "{start_label} must not be after {end_label}"
        )));
    }
    Ok(())
}

/// `part / whole * 100` capped to 100 and rounded to 2 decimals.
pub(crate) fn capped_percent(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    round2((part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_are_bounded() {
        assert!(ensure_positive_amount(MAX_AMOUNT_MINOR, "amount").is_ok());
        assert!(matches!(
            ensure_positive_amount(MAX_AMOUNT_MINOR + 1, "amount"),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(ensure_amount_in_range(-MAX_AMOUNT_MINOR, "balance").is_ok());
        assert!(ensure_amount_in_range(i64::MIN, "balance").is_err());
        assert!(ensure_amount_in_range(i64::MAX, "balance").is_err());
    }

    #[test]
    fn names_are_trimmed_and_need_two_chars() {
        assert_eq!(normalize_required_name("  Nubank ", "name").unwrap(), "Nubank");
        assert!(normalize_required_name(" a ", "name").is_err());
    }

    #[test]
    fn name_key_folds_case_and_compatibility_forms() {
        assert_eq!(name_key("Ｃａｓｈ"), name_key("cash"));
        assert_eq!(name_key(" SAVINGS "), "savings");
    }

    #[test]
    fn colors_must_be_hex() {
        assert!(ensure_color("#1976d2").is_ok());
        assert!(ensure_color("#1976D2").is_ok());
        assert!(ensure_color("1976d2").is_err());
        assert!(ensure_color("#19z6d2").is_err());
        assert!(ensure_color("#fff").is_err());
    }

    #[test]
    fn emails_need_local_part_and_dotted_domain() {
        assert_eq!(normalize_email(" Ana@Mail.COM ").unwrap(), "ana@mail.com");
        assert!(normalize_email("ana@mail").is_err());
        assert!(normalize_email("@mail.com").is_err());
        assert!(normalize_email("ana@@mail.com").is_err());
        assert!(normalize_email("a na@mail.com").is_err());
    }

    #[test]
    fn timezones_are_iana_names() {
        assert_eq!(ensure_timezone("Europe/Rome").unwrap(), "Europe/Rome");
        assert!(ensure_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn capped_percent_rounds_and_caps() {
        assert_eq!(capped_percent(1, 3), 33.33);
        assert_eq!(capped_percent(500, 100), 100.0);
        assert_eq!(capped_percent(5, 0), 0.0);
    }
}
