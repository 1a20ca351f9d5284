//! Country and currency codes offered when editing a user.

use once_cell::sync::Lazy;
use regex::Regex;

/// ISO 4217 currencies accepted for billing
pub const CURRENCIES: &[&str] = &["EUR", "USD", "GBP", "BRL", "CHF", "AOA", "MZN", "CVE"];

/// ISO 3166-1 alpha-2 countries accepted for billing
pub const COUNTRIES: &[&str] = &[
    "PT", "ES", "FR", "DE", "IT", "GB", "IE", "CH", "US", "BR", "AO", "MZ", "CV",
];

static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());
static COUNTRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

pub fn is_currency_code(code: &str) -> bool {
    CURRENCY_RE.is_match(code)
}

pub fn is_country_code(code: &str) -> bool {
    COUNTRY_RE.is_match(code)
}

pub fn is_supported_currency(code: &str) -> bool {
    CURRENCIES.contains(&code)
}

pub fn is_supported_country(code: &str) -> bool {
    COUNTRIES.contains(&code)
}

/// Note for a draft code outside the offered lists. Never blocks a save.
pub fn hint(field: &str, value: &str) -> Option<String> {
    let known = match field {
        "currency" => is_supported_currency(value),
        "country" => is_supported_country(value),
        _ => return None,
    };
    (!known).then(|| {
        format!(
            "Note: {} '{}' is not in the usual list (see /codes)",
            field, value
        )
    })
}
