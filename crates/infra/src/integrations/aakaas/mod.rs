//! Clients for the Add-on Assembly Kit as a Service (AAKaaS) catalog.
//!
//! All AAKaaS entities live under the OData v2 service
//! `/odata/aas_ocs_package`; one [`Connector`](crate::http::Connector)
//! instance per process talks to it.

pub mod package;
pub mod target_vector;
pub mod versionable;

/// Root path of the AAKaaS OData service.
pub const SERVICE_PATH: &str = "/odata/aas_ocs_package";

pub use package::{Package, PackageStatus};
pub use versionable::{
    resolve_wildcards, COMPONENT_STATUS_FILTER, COMPONENT_VERSION_ENTITY, PRODUCT_STATUS_FILTER,
    PRODUCT_VERSION_ENTITY,
};
