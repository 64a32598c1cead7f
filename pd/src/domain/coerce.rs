//! Field coercion
//!
//! Documents are edited by hand as often as by tools, so numeric fields accept
//! numbers, numeric strings or nothing, and are clamped into range instead of
//! rejected. Text fields accept null, and enum fields ignore case.

use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Highest allowed `order_index`
pub const MAX_ORDER_INDEX: u16 = 9999;

/// Highest allowed `history_depth`
pub const MAX_HISTORY_DEPTH: u16 = 999;

/// Highest allowed sampling temperature
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Clamp any integer into `0..=MAX_ORDER_INDEX`
pub fn clamp_order_index(value: i64) -> u16 {
    value.clamp(0, i64::from(MAX_ORDER_INDEX)) as u16
}

/// Clamp any integer into `0..=MAX_HISTORY_DEPTH`
pub fn clamp_history_depth(value: i64) -> u16 {
    value.clamp(0, i64::from(MAX_HISTORY_DEPTH)) as u16
}

/// Clamp into `0..=2` and round to two decimals; NaN becomes 0
pub fn clamp_temperature(value: f64) -> f64 {
    if value.is_nan() || value < 0.0 {
        return 0.0;
    }
    (value.min(MAX_TEMPERATURE) * 100.0).round() / 100.0
}

/// Normalize a card id: whitespace runs become `_`, anything else outside
/// `[a-zA-Z0-9_]` is dropped
pub fn normalize_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        }
    }
    out
}

/// Read a loosely typed JSON value as an integer, truncating fractions
///
/// Returns `None` for null, booleans, objects and unparseable strings.
pub fn loose_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

pub(crate) fn order_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(clamp_order_index(loose_integer(&value).unwrap_or(0)))
}

pub(crate) fn history_depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(clamp_history_depth(loose_integer(&other).unwrap_or(0))),
    })
}

pub(crate) fn temperature<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::Number(n) => n.as_f64().map(clamp_temperature),
        Value::String(s) => Some(clamp_temperature(s.trim().parse::<f64>().unwrap_or(0.0))),
        _ => Some(0.0),
    })
}

/// Any scalar as a string; null and containers become empty
pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// Truthiness of a loosely typed flag; null is false
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Probability in `0..=1`; null or garbage falls back to 1
pub(crate) fn probability<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|p| p.is_finite()).map_or(1.0, |p| p.clamp(0.0, 1.0)))
}

/// Parse an enum through its case-insensitive `FromStr`; null gives the default
pub(crate) fn any_case<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String> + Default,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => s.parse().map_err(D::Error::custom),
        None => Ok(T::default()),
    }
}
