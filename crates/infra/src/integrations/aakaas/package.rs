//! Delivery package lifecycle in AAKaaS: reservation, registration,
//! release.
//!
//! A package is reserved for a concrete component version via the
//! `DeterminePackageForScv` function import, filled with content by the
//! build framework, then registered (locking it) and finally released.

use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use adk_domain::{AdkError, Repository, Result};

use crate::http::Connector;
use crate::odata::envelope;

use super::SERVICE_PATH;

/// Status of a delivery package, encoded as a single letter on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PackageStatus {
    #[serde(rename = "P")]
    Planned,
    #[serde(rename = "L")]
    Locked,
    #[serde(rename = "R")]
    Released,
    #[serde(rename = "C")]
    CreationTriggered,
}

impl PackageStatus {
    pub fn code(self) -> &'static str {
        match self {
            PackageStatus::Planned => "P",
            PackageStatus::Locked => "L",
            PackageStatus::Released => "R",
            PackageStatus::CreationTriggered => "C",
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeterminePackageEnvelope {
    #[serde(rename = "DeterminePackageForScv")]
    package: PackageEntity,
}

#[derive(Debug, Default, Deserialize)]
struct PackageEntity {
    #[serde(default, rename = "Name")]
    name: String,
    #[serde(default, rename = "Type")]
    type_: String,
    #[serde(default, rename = "PredecessorCommitId")]
    predecessor_commit_id: String,
    #[serde(default, rename = "CommitId")]
    commit_id: String,
    #[serde(
        default,
        rename = "Status",
        deserialize_with = "adk_domain::types::wire::empty_string_as_none"
    )]
    status: Option<PackageStatus>,
    #[serde(default, rename = "Namespace")]
    namespace: String,
}

impl PackageEntity {
    fn is_empty(&self) -> bool {
        self.name.is_empty() && self.status.is_none()
    }
}

/// A delivery package of one software component version.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub component_name: String,
    pub version_yaml: String,
    pub version: String,
    pub sp_level: String,
    pub patch_level: String,
    pub package_name: String,
    pub package_type: String,
    pub predecessor_commit_id: String,
    pub commit_id: String,
    pub status: Option<PackageStatus>,
    pub namespace: String,
}

impl Package {
    /// Initialize the package for a repository whose version has already
    /// been resolved against the catalog.
    pub fn from_repository(repository: &Repository) -> Self {
        Self {
            component_name: repository.name.clone(),
            version_yaml: repository.version_yaml.clone(),
            version: repository.version.clone(),
            sp_level: repository.sp_level.clone(),
            patch_level: repository.patch_level.clone(),
            commit_id: repository.commit_id.clone(),
            ..Self::default()
        }
    }

    /// Reserve the next free package for this component version.
    pub async fn reserve_next(&mut self, connector: &mut Connector) -> Result<()> {
        if self.component_name.is_empty() || self.version.is_empty() {
            return Err(AdkError::Config(
                "Please provide the name and the resolved version of the software component"
                    .to_string(),
            ));
        }
        ensure_token(connector).await?;

        let suffix = format!(
            "{SERVICE_PATH}/DeterminePackageForScv?Name='{}'&Version='{}'&SpLevel='{}'&PatchLevel='{}'",
            urlencoding::encode(&self.component_name),
            urlencoding::encode(&self.version),
            urlencoding::encode(&self.sp_level),
            urlencoding::encode(&self.patch_level),
        );
        let response = connector.post(&suffix, "").await?;
        let entity = envelope::v2_entity::<DeterminePackageEnvelope>(&response)
            .map(|envelope| envelope.package)
            .and_then(|entity| envelope::reject_empty(entity, PackageEntity::is_empty))?;

        self.package_name = entity.name;
        self.package_type = entity.type_;
        self.predecessor_commit_id = entity.predecessor_commit_id;
        self.status = entity.status;
        info!(
            package = %self.package_name,
            component = %self.component_name,
            status = ?self.status,
            "Reserved delivery package"
        );
        Ok(())
    }

    /// Read the package header, picking up status and namespace.
    pub async fn fetch_status_and_namespace(&mut self, connector: &Connector) -> Result<()> {
        let suffix = format!(
            "{SERVICE_PATH}/OcsPackageSet('{}')",
            urlencoding::encode(&self.package_name),
        );
        let response = connector.get(&suffix).await?;
        let entity = envelope::v2_entity::<PackageEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, PackageEntity::is_empty))?;

        self.status = entity.status;
        self.set_namespace(&entity.namespace);
        Ok(())
    }

    /// Adopt a namespace value from the catalog. The backend reports the
    /// empty namespace as `"//"`; that value is normalized to the empty
    /// string, everything else passes through.
    pub fn set_namespace(&mut self, raw: &str) {
        self.namespace = if raw == "//" { String::new() } else { raw.to_string() };
    }

    /// Register (and thereby lock) the package. Already released
    /// packages are skipped.
    pub async fn register(&mut self, connector: &mut Connector) -> Result<()> {
        if self.status == Some(PackageStatus::Released) {
            info!(package = %self.package_name, "Package is already released, skipping registration");
            return Ok(());
        }
        self.call_function_import(connector, "RegisterPackage").await
    }

    /// Release the package after successful tests.
    pub async fn release(&mut self, connector: &mut Connector) -> Result<()> {
        self.call_function_import(connector, "ReleasePackage").await
    }

    async fn call_function_import(
        &mut self,
        connector: &mut Connector,
        function: &str,
    ) -> Result<()> {
        if self.package_name.is_empty() {
            return Err(AdkError::Config("No package name available".to_string()));
        }
        ensure_token(connector).await?;

        let suffix = format!(
            "{SERVICE_PATH}/{function}?Name='{}'",
            urlencoding::encode(&self.package_name),
        );
        let response = connector.post(&suffix, "").await?;
        let entity = envelope::v2_entity::<PackageEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, PackageEntity::is_empty))?;

        self.status = entity.status;
        info!(package = %self.package_name, status = ?self.status, "Package status changed");
        Ok(())
    }

    /// Copy the reserved package data back onto the owning repository.
    ///
    /// For planned packages the predecessor commit must differ from the
    /// commit being delivered - delivering the same commit twice would
    /// produce an empty delta.
    pub fn copy_fields_to_repository(&self, repository: &mut Repository) -> Result<()> {
        if self.status == Some(PackageStatus::Planned)
            && !self.predecessor_commit_id.is_empty()
            && self.predecessor_commit_id == repository.commit_id
        {
            return Err(AdkError::Semantic(format!(
                "The commit id {} is the same as the one of the predecessor package of {}",
                repository.commit_id, self.package_name,
            )));
        }

        repository.package_name = self.package_name.clone();
        repository.package_type = self.package_type.clone();
        repository.namespace = self.namespace.clone();
        repository.predecessor_commit_id = self.predecessor_commit_id.clone();
        if let Some(status) = self.status {
            repository.status = status.code().to_string();
        }
        Ok(())
    }
}

/// AAKaaS uses one CSRF token per session; fetch it lazily before the
/// first state-changing call.
async fn ensure_token(connector: &mut Connector) -> Result<()> {
    if connector.token().is_none() {
        connector.fetch_csrf_token(Method::HEAD, SERVICE_PATH).await?;
    }
    Ok(())
}
