//! Response envelopes of the OData protocol versions.
//!
//! The v2 services wrap every payload in `{"d": ...}` (collections in
//! `{"d": {"results": [...]}}`), the v4 services return bare entities and
//! `{"value": [...]}` collections.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use adk_domain::{AdkError, Result};

#[derive(Deserialize)]
struct V2Envelope<T> {
    d: T,
}

#[derive(Deserialize)]
struct V2Results<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct V4Collection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Decode a `{"d": <entity>}` response.
pub fn v2_entity<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: V2Envelope<T> =
        serde_json::from_str(body).map_err(|err| AdkError::Parse(err.to_string()))?;
    Ok(envelope.d)
}

/// Decode a `{"d": {"results": [...]}}` response.
pub fn v2_results<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let envelope: V2Envelope<V2Results<T>> =
        serde_json::from_str(body).map_err(|err| AdkError::Parse(err.to_string()))?;
    Ok(envelope.d.results)
}

/// Decode a bare v4 entity response.
pub fn v4_entity<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| AdkError::Parse(err.to_string()))
}

/// Decode a `{"value": [...]}` v4 collection response.
pub fn v4_collection<T: DeserializeOwned>(body: &str) -> Result<Vec<T>> {
    let envelope: V4Collection<T> =
        serde_json::from_str(body).map_err(|err| AdkError::Parse(err.to_string()))?;
    Ok(envelope.value)
}

/// Distinguish "absent" from "empty": a successfully decoded payload whose
/// entity is its zero value means the server refused the operation.
pub fn reject_empty<T>(entity: T, is_empty: impl Fn(&T) -> bool) -> Result<T> {
    if is_empty(&entity) {
        return Err(AdkError::EmptyResponse);
    }
    Ok(entity)
}
