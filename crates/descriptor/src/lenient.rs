//! Field deserializers that never fail.
//!
//! The vendor has shipped numbers as strings, strings as numbers and nested
//! objects as `null` at various points. A field of an unexpected type is
//! treated as absent instead of rejecting the whole descriptor.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings (trimmed, empty treated as absent) and numbers rendered as strings.
pub(crate) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Unsigned integers, including ones quoted as strings.
pub(crate) fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Nested objects; anything that doesn't deserialize into `T` is absent.
pub(crate) fn object<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Option<T>, D::Error> {
    Ok(match Value::deserialize(d)? {
        value @ Value::Object(_) => T::deserialize(value).ok(),
        _ => None,
    })
}
