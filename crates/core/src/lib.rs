//! # ADK Core
//!
//! Orchestration logic on top of the domain types - no I/O of its own.
//!
//! This crate contains:
//! - The [`abap::ports::SoftwareComponentApi`] driver contract
//! - The poll-to-terminal loop and terminal status classification
//! - The two-tier (overview + protocol) log printer
//!
//! ## Architecture Principles
//! - Only depends on `adk-common` and `adk-domain`
//! - All remote communication happens behind the port traits,
//!   implemented in `adk-infra`

pub mod abap;

pub use abap::logs::print_logs;
pub use abap::poll::{evaluate_action_outcome, poll_action, PollConfig};
pub use abap::ports::{RepositoryState, SoftwareComponentApi, Tag};
