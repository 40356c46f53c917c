//! Target vectors - deployable snapshots of an add-on product version.

use serde::{Deserialize, Serialize};

use crate::errors::{AdkError, Result};
use crate::types::descriptor::AddonDescriptor;

/// Lifecycle status of a target vector in AAKaaS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetVectorStatus {
    /// Generated, not published yet
    #[serde(rename = "G")]
    Generated,
    /// Published for testing
    #[serde(rename = "T")]
    Test,
    /// Published for productive use
    #[serde(rename = "P")]
    Productive,
}

impl TargetVectorStatus {
    pub fn code(self) -> &'static str {
        match self {
            TargetVectorStatus::Generated => "G",
            TargetVectorStatus::Test => "T",
            TargetVectorStatus::Productive => "P",
        }
    }
}

/// Status of an ongoing publish operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStatus {
    #[serde(rename = "R")]
    Running,
    #[serde(rename = "S")]
    Success,
    #[serde(rename = "E")]
    Error,
}

/// Scope of a publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishScope {
    Test,
    Productive,
}

impl PublishScope {
    pub fn code(self) -> &'static str {
        match self {
            PublishScope::Test => "T",
            PublishScope::Productive => "P",
        }
    }

    /// The target vector status this scope is expected to end up in.
    pub fn expected_status(self) -> TargetVectorStatus {
        match self {
            PublishScope::Test => TargetVectorStatus::Test,
            PublishScope::Productive => TargetVectorStatus::Productive,
        }
    }
}

/// A deployable state of a software component version within a target
/// vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetVectorCv {
    #[serde(default, rename = "Id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "ScName")]
    pub sc_name: String,
    #[serde(rename = "ScVersion")]
    pub sc_version: String,
    #[serde(rename = "DeliveryPackage")]
    pub delivery_package: String,
    #[serde(rename = "SpLevel")]
    pub sp_level: String,
    #[serde(rename = "PatchLevel")]
    pub patch_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetVectorCvs {
    #[serde(default)]
    pub results: Vec<TargetVectorCv>,
}

/// A target vector binding a product version to concrete component
/// package versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetVector {
    #[serde(default, rename = "Id", skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, rename = "ProductName")]
    pub product_name: String,
    #[serde(default, rename = "ProductVersion")]
    pub product_version: String,
    #[serde(default, rename = "SpsLevel")]
    pub sps_level: String,
    #[serde(default, rename = "PatchLevel")]
    pub patch_level: String,
    #[serde(
        default,
        rename = "Status",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::types::wire::empty_string_as_none"
    )]
    pub status: Option<TargetVectorStatus>,
    #[serde(
        default,
        rename = "PublishStatus",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::types::wire::empty_string_as_none"
    )]
    pub publish_status: Option<PublishStatus>,
    #[serde(default, rename = "Content")]
    pub content: TargetVectorCvs,
}

impl TargetVector {
    /// Assemble a new target vector from a fully resolved add-on
    /// descriptor.
    ///
    /// Product name, version, SPS level and patch level must be present,
    /// and every repository needs name, version, SP level, patch level
    /// and package name.
    pub fn init_new(descriptor: &AddonDescriptor) -> Result<Self> {
        if descriptor.addon_product.is_empty()
            || descriptor.addon_version.is_empty()
            || descriptor.addon_sps_level.is_empty()
            || descriptor.addon_patch_level.is_empty()
        {
            return Err(AdkError::Config(
                "Parameters missing. Please provide product name, version, spslevel and patchlevel"
                    .to_string(),
            ));
        }

        let mut content = Vec::with_capacity(descriptor.repositories.len());
        for repository in &descriptor.repositories {
            if repository.name.is_empty()
                || repository.version.is_empty()
                || repository.sp_level.is_empty()
                || repository.patch_level.is_empty()
                || repository.package_name.is_empty()
            {
                return Err(AdkError::Config(
                    "Parameters missing. Please provide software component name, version, splevel, patchlevel and packagename"
                        .to_string(),
                ));
            }
            content.push(TargetVectorCv {
                id: String::new(),
                sc_name: repository.name.clone(),
                sc_version: repository.version.clone(),
                delivery_package: repository.package_name.clone(),
                sp_level: repository.sp_level.clone(),
                patch_level: repository.patch_level.clone(),
            });
        }

        Ok(Self {
            product_name: descriptor.addon_product.clone(),
            product_version: descriptor.addon_version.clone(),
            sps_level: descriptor.addon_sps_level.clone(),
            patch_level: descriptor.addon_patch_level.clone(),
            content: TargetVectorCvs { results: content },
            ..Self::default()
        })
    }

    /// Reference an already existing target vector by its ID.
    pub fn init_existing(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::repository::Repository;

    fn resolved_descriptor() -> AddonDescriptor {
        AddonDescriptor {
            addon_product: "/DMO/PRODUCT1".to_string(),
            addon_version: "0001".to_string(),
            addon_sps_level: "0000".to_string(),
            addon_patch_level: "0000".to_string(),
            repositories: vec![Repository {
                name: "/DMO/COMP01".to_string(),
                version: "0001".to_string(),
                sp_level: "0000".to_string(),
                patch_level: "0000".to_string(),
                package_name: "SAPK-001AAINDMO".to_string(),
                ..Repository::default()
            }],
            ..AddonDescriptor::default()
        }
    }

    #[test]
    fn init_new_copies_descriptor_fields() {
        let tv = TargetVector::init_new(&resolved_descriptor()).unwrap();
        assert_eq!(tv.product_name, "/DMO/PRODUCT1");
        assert_eq!(tv.content.results.len(), 1);
        assert_eq!(tv.content.results[0].delivery_package, "SAPK-001AAINDMO");
    }

    #[test]
    fn init_new_requires_product_fields() {
        let mut descriptor = resolved_descriptor();
        descriptor.addon_version.clear();
        assert!(matches!(TargetVector::init_new(&descriptor), Err(AdkError::Config(_))));
    }

    #[test]
    fn init_new_requires_repository_fields() {
        let mut descriptor = resolved_descriptor();
        descriptor.repositories[0].package_name.clear();
        assert!(matches!(TargetVector::init_new(&descriptor), Err(AdkError::Config(_))));
    }

    #[test]
    fn serializes_with_aakaas_field_names() {
        let tv = TargetVector::init_new(&resolved_descriptor()).unwrap();
        let json = serde_json::to_string(&tv).unwrap();
        assert!(json.contains(r#""ProductName":"/DMO/PRODUCT1""#));
        assert!(json.contains(r#""Content":{"results":[{"#));
        // unset status fields stay out of the create payload
        assert!(!json.contains("\"Status\""));
        assert!(!json.contains("\"PublishStatus\""));
    }

    #[test]
    fn publish_scope_maps_to_expected_status() {
        assert_eq!(PublishScope::Test.expected_status(), TargetVectorStatus::Test);
        assert_eq!(PublishScope::Productive.expected_status(), TargetVectorStatus::Productive);
        assert_eq!(PublishScope::Test.code(), "T");
    }
}
