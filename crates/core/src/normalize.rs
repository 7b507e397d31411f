//! Interpretation rules for raw CRM property values.
//!
//! HubSpot stores every deal property as text. The offer page has always
//! read them leniently: leading whitespace is skipped and the longest numeric
//! prefix wins, so `"1500.00"`, `" 12 semanas"` and `"2.5 %"` all parse.
//! Values without a numeric prefix fall back to a per-field default.

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::deal::ContactRecord;

/// Weekly rate used when the deal carries none (2.88%).
pub const FALLBACK_WEEKLY_RATE: Decimal = Decimal::from_parts(288, 0, 0, false, 4);

/// Display name used when the deal has no contact or the contact has no name.
pub const FALLBACK_CONTACT_NAME: &str = "Cliente";

/// Parses the leading decimal number of `raw`, if any.
///
/// Numbers beyond the `Decimal` range saturate at `Decimal::MAX`/`MIN`;
/// magnitudes below its smallest scale round to zero.
pub fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    let prefix = numeric_prefix(raw?, true)?;
    exact_decimal(prefix).or_else(|| approximate_decimal(prefix))
}

/// Parses the leading integer of `raw`, if any. Fractions are truncated and
/// values beyond `i64` saturate.
pub fn parse_integer(raw: Option<&str>) -> Option<i64> {
    let prefix = numeric_prefix(raw?, false)?;
    match prefix.trim_start_matches('+').parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) if prefix.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

pub fn money_or_zero(raw: Option<&str>) -> Decimal {
    parse_decimal(raw).unwrap_or(Decimal::ZERO)
}

pub fn periods_or_zero(raw: Option<&str>) -> i64 {
    parse_integer(raw).unwrap_or(0)
}

/// Normalizes a weekly interest rate to a fraction.
///
/// Values above 1 are read as whole percentages and divided by 100; values
/// at or below 1 are already fractional. A stored `1` therefore means 100%,
/// never 1%. Missing or non-numeric rates use [`FALLBACK_WEEKLY_RATE`].
pub fn normalize_weekly_rate(raw: Option<&str>) -> Decimal {
    match parse_decimal(raw) {
        Some(rate) if rate > Decimal::ONE => rate / Decimal::ONE_HUNDRED,
        Some(rate) => rate,
        None => FALLBACK_WEEKLY_RATE,
    }
}

/// `firstname lastname`, trimmed, or [`FALLBACK_CONTACT_NAME`].
pub fn contact_display_name(contact: Option<&ContactRecord>) -> String {
    let Some(contact) = contact else {
        return FALLBACK_CONTACT_NAME.to_string();
    };

    let joined = format!(
        "{} {}",
        contact.firstname.as_deref().unwrap_or_default(),
        contact.lastname.as_deref().unwrap_or_default()
    );
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        FALLBACK_CONTACT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn numeric_prefix(raw: &str, allow_fraction: bool) -> Option<&str> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let integer_digits = count_digits(&bytes[end..]);
    end += integer_digits;

    let mut fraction_digits = 0;
    if allow_fraction && bytes.get(end) == Some(&b'.') {
        fraction_digits = count_digits(&bytes[end + 1..]);
        if integer_digits > 0 || fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }

    if integer_digits == 0 && fraction_digits == 0 {
        return None;
    }

    if allow_fraction && matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut cursor = end + 1;
        if matches!(bytes.get(cursor), Some(b'+' | b'-')) {
            cursor += 1;
        }
        let exponent_digits = count_digits(&bytes[cursor..]);
        if exponent_digits > 0 {
            end = cursor + exponent_digits;
        }
    }

    Some(&text[..end])
}

fn exact_decimal(prefix: &str) -> Option<Decimal> {
    let (mantissa, exponent) = match prefix.find(['e', 'E']) {
        Some(index) => (&prefix[..index], Some(&prefix[index + 1..])),
        None => (prefix, None),
    };

    let mantissa = canonical_mantissa(mantissa);
    match exponent {
        Some(exponent) => {
            Decimal::from_scientific(&format!("{mantissa}e{}", exponent.trim_start_matches('+')))
                .ok()
        }
        None => Decimal::from_str(&mantissa).ok(),
    }
}

fn approximate_decimal(prefix: &str) -> Option<Decimal> {
    let value = prefix.parse::<f64>().ok().filter(|value| !value.is_nan())?;
    if value.abs() < 1e-28 {
        return Some(Decimal::ZERO);
    }

    let fallback = match value {
        value if value.abs() < 1.0 => Decimal::ZERO,
        value if value.is_sign_negative() => Decimal::MIN,
        _ => Decimal::MAX,
    };
    Some(Decimal::from_f64(value).unwrap_or(fallback))
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}

fn canonical_mantissa(mantissa: &str) -> String {
    let (sign, digits) = match mantissa.as_bytes().first() {
        Some(b'-') => ("-", &mantissa[1..]),
        Some(b'+') => ("", &mantissa[1..]),
        _ => ("", mantissa),
    };
    let digits = digits.trim_end_matches('.');
    if digits.starts_with('.') {
        format!("{sign}0{digits}")
    } else {
        format!("{sign}{digits}")
    }
}
