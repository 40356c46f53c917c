//! # ADK Domain
//!
//! Error taxonomy and data types shared across the ADK workspace.
//!
//! This crate contains:
//! - The [`AdkError`] sum type and the [`Result`] alias
//! - Wire and configuration types (repositories, add-on descriptors,
//!   actions, logs, builds, target vectors)
//! - The pure part of the version resolver ([`version::Versionable`])
//!
//! ## Architecture Principles
//! - No I/O and no async code; everything here is plain data and logic
//! - All remote clients live in `adk-infra` and depend on these types

pub mod errors;
pub mod types;
pub mod version;

pub use errors::{AdkError, Result};
pub use types::action::{
    ActionEntity, ActionStatus, ExecutionLogEntry, LogEntryStatus, LogOverviewEntry,
    LogProtocolLine, RepositoryEntity,
};
pub use types::build::{BuildValue, MessageType, ResultState, RunState};
pub use types::descriptor::AddonDescriptor;
pub use types::repository::Repository;
pub use types::target_vector::{PublishScope, PublishStatus, TargetVector, TargetVectorCv, TargetVectorStatus};
pub use version::Versionable;
