//! Wildcard resolution of component and product versions against the
//! AAKaaS catalog.
//!
//! The catalog is queried with `$top=1` ordered descending by the
//! wildcard segment; tie-breaks are decided server-side and the client
//! applies no secondary sort. The delivery-status filter fragment differs
//! between components and products and is supplied by the call site.

use serde::Deserialize;
use tracing::debug;

use adk_domain::version::{ResolvedLevels, VersionSegment, Versionable};
use adk_domain::{AdkError, Result};

use crate::http::Connector;
use crate::odata::envelope;

/// Entity set of add-on component versions.
pub const COMPONENT_VERSION_ENTITY: &str = "/odata/aas_ocs_package/xSSDAxC_Component_Version";
/// Entity set of add-on product versions.
pub const PRODUCT_VERSION_ENTITY: &str = "/odata/aas_ocs_package/xSSDAxC_Product_Version";

/// Delivery states counting as existing for component versions.
pub const COMPONENT_STATUS_FILTER: &str =
    "DeliveryStatus eq 'R' or DeliveryStatus eq 'C'";
/// Delivery states counting as existing for product versions.
pub const PRODUCT_STATUS_FILTER: &str = "DeliveryStatus eq 'T' or DeliveryStatus eq 'P'";

const SELECT_FIELDS: &str = "Name,Version,TechRelease,TechSpLevel,TechPatchLevel,Namespace";

#[derive(Debug, Deserialize)]
struct CatalogVersion {
    #[serde(default, rename = "TechRelease")]
    tech_release: String,
    #[serde(default, rename = "TechSpLevel")]
    tech_sp_level: String,
    #[serde(default, rename = "TechPatchLevel")]
    tech_patch_level: String,
}

/// Resolve the wildcard segment of `versionable`, if any, by querying
/// the catalog at `entity_url` with the given delivery-status filter.
///
/// A plain version without wildcard is a no-op. An empty result set
/// resolves against the zero baseline; more than one hit is an error -
/// the `$top=1` contract guarantees a well-defined maximum.
pub async fn resolve_wildcards(
    versionable: &mut Versionable,
    connector: &Connector,
    entity_url: &str,
    status_filter: &str,
) -> Result<()> {
    let Some(wildcard) = versionable.wildcard() else {
        return Ok(());
    };

    let filter = segment_filter(versionable, wildcard.segment, status_filter);
    let suffix = format!(
        "{entity_url}?$filter={}&$format=json&$orderby={}&$select={}&$top=1",
        urlencoding::encode(&filter),
        urlencoding::encode(&format!("{} desc", wildcard.segment.order_by())),
        urlencoding::encode(SELECT_FIELDS),
    );
    debug!(%suffix, "Resolving version wildcard");

    let response = connector.get(&suffix).await?;
    let hits: Vec<CatalogVersion> = envelope::v2_results(&response)?;

    let hit = match hits.as_slice() {
        [] => None,
        [single] => Some(ResolvedLevels {
            tech_release: single.tech_release.clone(),
            tech_sp_level: single.tech_sp_level.clone(),
            tech_patch_level: single.tech_patch_level.clone(),
        }),
        _ => {
            return Err(AdkError::Semantic(format!(
                "Unexpected number of entries ({}) when resolving the version of '{}'",
                hits.len(),
                versionable.name,
            )))
        }
    };

    versionable.apply_wildcard(hit.as_ref())
}

fn segment_filter(
    versionable: &Versionable,
    segment: VersionSegment,
    status_filter: &str,
) -> String {
    let fixed = match segment {
        VersionSegment::Release => {
            "TechSpLevel eq '0000' and TechPatchLevel eq '0000'".to_string()
        }
        VersionSegment::SpLevel => format!(
            "TechRelease eq '{}' and TechPatchLevel eq '0000'",
            versionable.tech_release,
        ),
        VersionSegment::PatchLevel => format!(
            "TechRelease eq '{}' and TechSpLevel eq '{}'",
            versionable.tech_release, versionable.tech_sp_level,
        ),
    };
    format!("Name eq '{}' and {} and ( {} )", versionable.name, fixed, status_filter)
}

/// Convenience wrapper for component versions.
pub async fn resolve_component_version(
    versionable: &mut Versionable,
    connector: &Connector,
) -> Result<()> {
    resolve_wildcards(versionable, connector, COMPONENT_VERSION_ENTITY, COMPONENT_STATUS_FILTER)
        .await
}

/// Convenience wrapper for product versions.
pub async fn resolve_product_version(
    versionable: &mut Versionable,
    connector: &Connector,
) -> Result<()> {
    resolve_wildcards(versionable, connector, PRODUCT_VERSION_ENTITY, PRODUCT_STATUS_FILTER).await
}
