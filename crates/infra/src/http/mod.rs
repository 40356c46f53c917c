//! HTTP plumbing for the OData services.

mod connector;

pub use connector::{Connector, ConnectorConfig};
