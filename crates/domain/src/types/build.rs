//! States and values of the ABAP build framework.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a build run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Initializing,
    Accepted,
    Running,
    Finished,
    Failed,
}

impl RunState {
    /// Whether the build run has ended, successfully or not.
    pub fn is_final(self) -> bool {
        matches!(self, RunState::Finished | RunState::Failed)
    }
}

/// Outcome of a build run or a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultState {
    Successful,
    Warning,
    Erroneous,
    Aborted,
}

/// Message type of a build log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "I")]
    Info,
    #[serde(rename = "W")]
    Warning,
    #[serde(rename = "E")]
    Error,
    #[serde(rename = "A")]
    Aborted,
}

/// A named input or output value of a build run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildValue {
    #[serde(rename = "value_id")]
    pub value_id: String,
    pub value: String,
}

impl BuildValue {
    pub fn new(value_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { value_id: value_id.into(), value: value.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_states_decode_from_uppercase() {
        let state: RunState = serde_json::from_str("\"ACCEPTED\"").unwrap();
        assert_eq!(state, RunState::Accepted);
        assert!(!state.is_final());

        let state: RunState = serde_json::from_str("\"FINISHED\"").unwrap();
        assert!(state.is_final());
        let state: RunState = serde_json::from_str("\"FAILED\"").unwrap();
        assert!(state.is_final());
    }

    #[test]
    fn build_value_serializes_with_wire_names() {
        let value = BuildValue::new("PHASE", "AUNIT");
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"value_id":"PHASE","value":"AUNIT"}"#
        );
    }

    #[test]
    fn message_types_use_single_letters() {
        let msgty: MessageType = serde_json::from_str("\"W\"").unwrap();
        assert_eq!(msgty, MessageType::Warning);
    }
}
