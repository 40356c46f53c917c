//! Deserialization helpers for quirks of the OData wire formats.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Deserialize an optional coded value where the backend reports "unset"
/// as the empty string instead of omitting the field.
///
/// `null`, a missing field (via `#[serde(default)]`) and `""` all map to
/// `None`; any other invalid value remains an error.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(ref code) if code.is_empty() => Ok(None),
        other => T::deserialize(other).map(Some).map_err(serde::de::Error::custom),
    }
}
