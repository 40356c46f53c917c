//! Asynchronous actions on the ABAP Git service and their two-tier logs.

use serde::{Deserialize, Serialize};

/// Status of a server-side action, encoded as a single letter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    #[serde(rename = "R")]
    Running,
    #[serde(rename = "Q")]
    Queued,
    #[serde(rename = "S")]
    Success,
    #[serde(rename = "E")]
    Error,
    #[serde(rename = "W")]
    Warning,
    #[serde(rename = "A")]
    Aborted,
}

impl ActionStatus {
    /// The single-letter wire code.
    pub fn code(self) -> &'static str {
        match self {
            ActionStatus::Running => "R",
            ActionStatus::Queued => "Q",
            ActionStatus::Success => "S",
            ActionStatus::Error => "E",
            ActionStatus::Warning => "W",
            ActionStatus::Aborted => "A",
        }
    }

    /// Whether the action has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ActionStatus::Running | ActionStatus::Queued)
    }
}

/// An action entity as returned by trigger and status requests.
///
/// A decoded response where both `uuid` and `status` are absent counts as
/// the zero value; the server refused the operation in that case.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionEntity {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub sc_name: String,
    #[serde(default)]
    pub branch_name: String,
    #[serde(default, deserialize_with = "crate::types::wire::empty_string_as_none")]
    pub status: Option<ActionStatus>,
    #[serde(default, rename = "status_descr")]
    pub status_description: String,
    #[serde(default, rename = "to_Log_Overview")]
    pub to_log_overview: Option<LogOverviewResults>,
}

impl ActionEntity {
    /// True when the payload decoded to the zero value of the entity.
    pub fn is_empty(&self) -> bool {
        self.uuid.is_empty() && self.status.is_none()
    }
}

/// A repository / software component entity on the ABAP system.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryEntity {
    #[serde(default)]
    pub sc_name: String,
    #[serde(default)]
    pub avail_on_inst: bool,
    #[serde(default)]
    pub active_branch: String,
    #[serde(default)]
    pub byog_url: String,
}

impl RepositoryEntity {
    pub fn is_empty(&self) -> bool {
        self.sc_name.is_empty() && !self.avail_on_inst && self.active_branch.is_empty()
    }
}

/// Status classification of a log overview phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntryStatus {
    Success,
    Warning,
    Error,
}

impl LogEntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogEntryStatus::Success => "Success",
            LogEntryStatus::Warning => "Warning",
            LogEntryStatus::Error => "Error",
        }
    }
}

/// One phase in the log overview.
#[derive(Debug, Clone, Deserialize)]
pub struct LogOverviewEntry {
    #[serde(rename = "log_index")]
    pub index: i64,
    #[serde(rename = "log_name")]
    pub name: String,
    #[serde(rename = "type_of_found_issues")]
    pub status: LogEntryStatus,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, rename = "to_Log_Protocol")]
    pub to_log_protocol: Option<DeferredProtocol>,
}

/// Envelope for the expanded log overview of the OData v2 service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogOverviewResults {
    #[serde(default)]
    pub results: Vec<LogOverviewEntry>,
}

/// Deferred navigation to the protocol of an overview phase (OData v2).
#[derive(Debug, Clone, Deserialize)]
pub struct DeferredProtocol {
    #[serde(rename = "__deferred")]
    pub deferred: DeferredUri,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeferredUri {
    pub uri: String,
}

/// One detail line of a phase protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct LogProtocolLine {
    #[serde(default, rename = "log_index")]
    pub overview_index: i64,
    #[serde(rename = "index_no")]
    pub protocol_line: i64,
    #[serde(default, rename = "type")]
    pub line_type: String,
    #[serde(default, rename = "descr")]
    pub description: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One line of the execution log (OData v4 service only).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionLogEntry {
    #[serde(default, rename = "index_no")]
    pub index: String,
    #[serde(default, rename = "type")]
    pub line_type: String,
    #[serde(default, rename = "descr")]
    pub description: String,
    #[serde(default)]
    pub timestamp: String,
}
