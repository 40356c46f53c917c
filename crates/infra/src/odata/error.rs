//! Translation of OData error bodies into `(code, message)` pairs.
//!
//! Two shapes exist on the wire. The v2 services answer with
//! `{"error": {"code": ..., "message": {"lang": ..., "value": ...},
//! "innererror": {"errordetails": [...]}}}`, the v4 services with a plain
//! `{"error": {"code": ..., "message": ...}}` pair. The translator never
//! fails; unparseable bodies yield an empty code and a generic message.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};

use adk_domain::AdkError;

static EOF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let pattern = Regex::new(r".*EOF$").unwrap();
    pattern
});

#[derive(Deserialize)]
struct V2Body {
    error: V2Error,
}

#[derive(Deserialize)]
struct V2Error {
    #[serde(default)]
    code: String,
    message: V2Message,
    #[serde(default)]
    innererror: Option<InnerError>,
}

#[derive(Deserialize)]
struct V2Message {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct InnerError {
    #[serde(default)]
    errordetails: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct V4Body {
    error: V4Error,
}

#[derive(Deserialize)]
struct V4Error {
    #[serde(default)]
    code: String,
    message: String,
}

/// Extract `(code, message)` from an error response body.
pub fn translate_error_body(body: &str) -> (String, String) {
    if let Ok(parsed) = serde_json::from_str::<V2Body>(body) {
        let message = match parsed.error.innererror.as_ref() {
            Some(inner) if !inner.errordetails.is_empty() => {
                render_error_stack(&inner.errordetails)
            }
            _ => parsed.error.message.value,
        };
        return (parsed.error.code, message);
    }
    if let Ok(parsed) = serde_json::from_str::<V4Body>(body) {
        return (parsed.error.code, parsed.error.message);
    }
    (String::new(), "Could not parse the JSON error response".to_string())
}

/// Render the v2 error detail stack as numbered lines, skipping details
/// whose message equals the immediately preceding one.
fn render_error_stack(details: &[ErrorDetail]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(details.len());
    let mut previous: Option<&str> = None;
    for detail in details {
        if previous == Some(detail.message.as_str()) {
            continue;
        }
        lines.push(format!("[{}] {}", lines.len() + 1, detail.message));
        previous = Some(detail.message.as_str());
    }
    lines.join("\n")
}

/// Map a request that never produced a response (timeout, reset) to a
/// connection error. Responses ending in `EOF` get an advisory line
/// naming the usual network-configuration causes.
pub fn connection_failure(err: &reqwest::Error) -> AdkError {
    let description = describe(err);
    error!(error = %description, "Request failed");

    if EOF_PATTERN.is_match(&description) {
        info!("-------------------------");
        info!("A connection could not be established to the ABAP system. The typical root cause is the network configuration (firewall, IP allowlist, etc.)");
        info!("-------------------------");
    }

    AdkError::Connection(description)
}

fn describe(err: &reqwest::Error) -> String {
    let mut description = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        description.push_str(": ");
        description.push_str(&inner.to_string());
        source = inner.source();
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_v2_bodies() {
        let (code, message) = translate_error_body(
            r#"{"error":{"code":"A4C_A2G/228","message":{"lang":"en","value":"Software component is already in use"}}}"#,
        );
        assert_eq!(code, "A4C_A2G/228");
        assert_eq!(message, "Software component is already in use");
    }

    #[test]
    fn translates_v4_bodies() {
        let (code, message) =
            translate_error_body(r#"{"error":{"code":"A4C_A2G/501","message":"Locked"}}"#);
        assert_eq!(code, "A4C_A2G/501");
        assert_eq!(message, "Locked");
    }

    #[test]
    fn renders_the_v2_detail_stack() {
        let (code, message) = translate_error_body(
            r#"{"error":{"code":"ED","message":{"lang":"en","value":"outer"},"innererror":{"errordetails":[
                {"code":"a","message":"first"},
                {"code":"b","message":"second"}
            ]}}}"#,
        );
        assert_eq!(code, "ED");
        assert_eq!(message, "[1] first\n[2] second");
    }

    #[test]
    fn skips_adjacent_duplicate_detail_messages() {
        let (_, message) = translate_error_body(
            r#"{"error":{"code":"ED","message":{"lang":"en","value":"outer"},"innererror":{"errordetails":[
                {"message":"same"},
                {"message":"same"},
                {"message":"different"}
            ]}}}"#,
        );
        assert_eq!(message, "[1] same\n[2] different");
    }

    #[test]
    fn never_fails_on_garbage() {
        let (code, message) = translate_error_body("<html>gateway timeout</html>");
        assert!(code.is_empty());
        assert_eq!(message, "Could not parse the JSON error response");
    }
}
