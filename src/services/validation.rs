//! Input validation helpers shared by the form-handling services

use once_cell::sync::Lazy;
use regex::Regex;

/// Deliberately loose: one `@`, no whitespace, a dot in the domain
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Whether `email` looks like a deliverable address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

/// Normalize an email for storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trimmed value, or `None` when blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Convert a currency amount to whole cents.
///
/// `None` for negative or non-finite values and for more than two decimals.
pub fn to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount < 0.0 || amount > 1e12 {
        return None;
    }
    let scaled = amount * 100.0;
    let cents = scaled.round();
    if (scaled - cents).abs() > 1e-6 {
        return None;
    }
    Some(cents as i64)
}

/// Cents back to currency units
pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}
