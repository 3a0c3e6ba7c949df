//! Text normalisation and numeric coercion.
//!
//! RULE: every code, unit, family, phase, product, role and task name
//! comparison goes through `normalize_label`. Every loosely typed number
//! (strings with `%`, spaces or decimal commas) goes through `parse_number`
//! before it reaches the engine.

use crate::error::{WorkloadError, WorkloadResult};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Fold accents, uppercase, trim and collapse inner whitespace.
///
/// Input is decomposed (NFD) first so precomposed and combining-mark
/// spellings of the same label compare equal.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        match ch {
            'œ' | 'Œ' => out.push_str("OE"),
            'æ' | 'Æ' => out.push_str("AE"),
            '’' | '`' => out.push('\''),
            other => out.extend(other.to_uppercase()),
        }
    }
    out
}

/// True when `haystack` (already normalised) contains any of `needles`
/// after normalising them.
pub fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .map(|n| normalize_label(n))
        .any(|n| !n.is_empty() && haystack.contains(&n))
}

/// Parse a loosely formatted number: `"1 250,5"`, `"75%"`, `" 0.2 "`.
/// Empty strings are treated as absent.
pub fn parse_number(field: &str, raw: &str) -> WorkloadResult<Option<f64>> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '%' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| WorkloadError::InvalidNumber {
            field: field.to_string(),
            raw: raw.to_string(),
        })
}

/// Coerce a JSON value (number, numeric string or null) to a float.
pub fn coerce_value(field: &str, value: &Value) -> WorkloadResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => parse_number(field, s),
        Value::Bool(b) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        other => Err(WorkloadError::InvalidNumber {
            field: field.to_string(),
            raw: other.to_string(),
        }),
    }
}

/// Percent fields accept either a fraction in [0, 1] or a percentage in
/// (1, 100]. Returns the fraction.
pub fn normalize_percent(field: &str, value: f64) -> WorkloadResult<f64> {
    if !(0.0..=100.0).contains(&value) || value.is_nan() {
        return Err(WorkloadError::InvalidPercent {
            field: field.to_string(),
            value,
        });
    }
    Ok(if value > 1.0 { value / 100.0 } else { value })
}

pub fn normalize_opt_percent(field: &str, value: Option<f64>) -> WorkloadResult<Option<f64>> {
    value.map(|v| normalize_percent(field, v)).transpose()
}

/// serde helper: `Option<f64>` from a number, a numeric string or null.
pub fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) => coerce_value("number", &value).map_err(serde::de::Error::custom),
    }
}

/// serde helper: `f64` from a number or numeric string, absent → 0.
pub fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_opt_number(deserializer).map(|v| v.unwrap_or(0.0))
}
