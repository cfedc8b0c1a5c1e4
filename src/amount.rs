//! Monetary amount recognition
//!
//! Statements print amounts with comma thousands separators and an optional
//! dollar sign. Numbers are read leniently: the longest numeric prefix of the
//! token counts and anything after it is ignored, so trailing markers such as
//! `CR` do not disqualify an amount.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)").unwrap()
});

/// Parse the numeric prefix of `s`, if any
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let caps = LEADING_NUMBER_RE.captures(s)?;
    caps.get(1)?.as_str().parse::<f64>().ok()
}

/// Whether a token is a monetary amount
///
/// After removing `,` and `$` and trimming, the token must start with a number
/// and contain at least one digit. The digit check rejects leftovers like `.`
/// or `-`.
pub fn is_amount(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let stripped: String = text.chars().filter(|c| *c != ',' && *c != '$').collect();
    let stripped = stripped.trim();

    parse_leading_number(stripped).is_some() && stripped.chars().any(|c| c.is_ascii_digit())
}

/// Parse an amount cell, removing thousands separators only
pub fn parse_amount(text: &str) -> Option<f64> {
    parse_leading_number(&text.replace(',', ""))
}
