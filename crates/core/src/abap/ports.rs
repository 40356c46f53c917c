//! Driver contract for the ABAP Git software component service.
//!
//! Two protocol variants of the service exist side-by-side (an OData v2
//! and an OData v4 one); both are driven through this trait. Variant
//! selection happens at construction time in `adk-infra`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use adk_domain::types::action::{
    ActionStatus, ExecutionLogEntry, LogOverviewEntry, LogProtocolLine,
};
use adk_domain::Result;

/// A git tag to be created on a software component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.description.is_empty()
    }
}

/// State of a software component on the ABAP system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryState {
    /// Whether the component is already cloned onto the instance.
    pub cloned: bool,
    /// The branch currently checked out (empty when not cloned).
    pub active_branch: String,
    /// Whether the component is connected to a bring-your-own-git remote.
    pub byog: bool,
}

/// Operations offered by the ABAP Git software component service.
///
/// Ordering contract: [`ensure_session`](Self::ensure_session) happens
/// before any state-changing call; a trigger happens before polling;
/// polling happens before log retrieval. One driver instance serves one
/// action at a time.
#[async_trait]
pub trait SoftwareComponentApi: Send {
    /// Authenticate against the service and fetch the CSRF token.
    async fn ensure_session(&mut self) -> Result<()>;

    /// Trigger a clone of the configured repository. On success the
    /// driver holds the UUID of the started action.
    async fn trigger_clone(&mut self) -> Result<()>;

    /// Trigger a pull of the configured repository.
    async fn trigger_pull(&mut self) -> Result<()>;

    /// Trigger a branch checkout for the configured repository.
    async fn trigger_checkout_branch(&mut self) -> Result<()>;

    /// Create a git tag on the configured repository.
    async fn create_tag(&mut self, tag: &Tag) -> Result<()>;

    /// Look up the clone state of the configured repository.
    async fn repository_state(&mut self) -> Result<RepositoryState>;

    /// Re-read the status of the in-flight action.
    async fn action_status(&mut self) -> Result<ActionStatus>;

    /// Fetch the log overview of the in-flight action.
    async fn log_overview(&mut self) -> Result<Vec<LogOverviewEntry>>;

    /// Fetch one page of the protocol behind an overview entry. Returns
    /// the page and the total line count.
    async fn log_protocol(
        &mut self,
        entry: &LogOverviewEntry,
        page: usize,
    ) -> Result<(Vec<LogProtocolLine>, usize)>;

    /// Fetch the execution log of the in-flight action.
    async fn execution_log(&mut self) -> Result<Vec<ExecutionLogEntry>>;

    /// UUID of the in-flight action; empty after a failed trigger.
    fn action_uuid(&self) -> &str;

    /// Decode a timestamp in the wire format of this protocol variant.
    /// Unparseable values map to the Unix epoch.
    fn convert_time(&self, raw: &str) -> DateTime<Utc>;
}
