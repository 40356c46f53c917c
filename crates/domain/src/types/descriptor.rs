//! The add-on descriptor (`addon.yml`) - the product manifest.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{AdkError, Result};
use crate::types::repository::Repository;

/// Product manifest describing an add-on product version and the software
/// components it is assembled from.
///
/// The descriptor owns its repositories; lookups within the descriptor go
/// by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonDescriptor {
    #[serde(default, rename = "addonProduct")]
    pub addon_product: String,
    #[serde(default, rename = "addonVersion")]
    pub addon_version_yaml: String,
    #[serde(default, rename = "addonVersionAAK")]
    pub addon_version: String,
    #[serde(default, rename = "addonSpsLevel")]
    pub addon_sps_level: String,
    #[serde(default, rename = "addonPatchLevel")]
    pub addon_patch_level: String,
    #[serde(default, rename = "targetVectorID")]
    pub target_vector_id: String,
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl AddonDescriptor {
    /// Parse a descriptor from its YAML manifest.
    pub fn from_yaml(manifest: &str) -> Result<Self> {
        serde_yaml::from_str(manifest)
            .map_err(|err| AdkError::Config(format!("Could not parse the add-on descriptor: {err}")))
    }

    /// Validate that the descriptor is usable for the delivery lifecycle:
    /// at least one repository, every repository named, names unique.
    pub fn check_repositories(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(AdkError::Config(
                "AddonDescriptor doesn't contain any repositories".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for repository in &self.repositories {
            if repository.name.is_empty() {
                return Err(AdkError::Config(
                    "Repository without a name in the add-on descriptor".to_string(),
                ));
            }
            if !seen.insert(repository.name.as_str()) {
                return Err(AdkError::Semantic(format!(
                    "Duplicate software component name '{}' in the add-on descriptor",
                    repository.name
                )));
            }
        }
        Ok(())
    }

    /// Find a repository by its component name.
    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|repository| repository.name == name)
    }

    pub fn repository_mut(&mut self, name: &str) -> Option<&mut Repository> {
        self.repositories.iter_mut().find(|repository| repository.name == name)
    }
}
