//! Field-level deserializers for the fetch boundary.
//!
//! RULE: a bad field defaults; it never discards the entry that holds it.
//! Numbers may arrive as integers, floats or numeric strings. `null` and
//! values of the wrong type become `None` or the field's zero value.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// Numeric reading of a JSON value, if it has one.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn whole(value: &Value) -> Option<f64> {
    number(value).filter(|n| n.fract() == 0.0)
}

/// A list whose entries are parsed one by one. A non-array (including
/// `null`) is empty and entries that still fail to parse are dropped.
pub(crate) fn seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A nested object that is dropped as a whole when it does not parse.
pub(crate) fn opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Display text. Anything but a string reads as empty.
pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

pub(crate) fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?))
}

/// Missing or unreadable coordinates read as 0.
pub(crate) fn f64_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

/// Integer identities. Fractional values are not identities.
pub(crate) fn opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(whole(&value)
        .filter(|n| *n >= i64::MIN as f64 && *n <= i64::MAX as f64)
        .map(|n| n as i64))
}

/// Team and slot indices: whole and non-negative, else `None`.
pub(crate) fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(whole(&value)
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

/// Counts saturate into `u32`: negatives read as 0 and fractions truncate.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).map_or(0, |n| n as u32))
}

/// Signed amounts such as coins. Unreadable values read as 0.
pub(crate) fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).map_or(0, |n| n as i64))
}

/// Truthiness: `null`, `false`, 0 and `""` are false.
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
