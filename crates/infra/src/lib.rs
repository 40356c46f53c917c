//! # ADK Infrastructure
//!
//! Remote clients for the ABAP Environment and AAKaaS backends.
//!
//! This crate contains:
//! - The OData [`http::Connector`] (reqwest, cookie jar, CSRF handling)
//! - OData v2/v4 error body translation
//! - The two ABAP Git driver variants behind the core port
//! - AAKaaS clients: version resolution, package lifecycle, target vectors
//! - The ABAP build framework client
//!
//! ## Architecture
//! - Implements the port traits defined in `adk-core`
//! - Depends on `adk-common`, `adk-domain` and `adk-core`
//! - Contains all "impure" code (network, file system)

pub mod http;
pub mod integrations;
pub mod odata;

pub use http::{Connector, ConnectorConfig};
pub use integrations::mgit::{ApiVariant, SoftwareComponentClient};
