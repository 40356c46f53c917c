//! Drivers for the ABAP Git software component service.
//!
//! The service exists in two protocol generations which are offered
//! side-by-side: a legacy OData v2 one and an OData v4 one with bound
//! actions. Both are driven through the
//! [`SoftwareComponentApi`](adk_core::SoftwareComponentApi) port; the
//! variant is selected when the client is constructed.

pub mod v2;
pub mod v4;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use adk_core::{RepositoryState, SoftwareComponentApi, Tag};
use adk_domain::types::action::{
    ActionStatus, ExecutionLogEntry, LogOverviewEntry, LogProtocolLine,
};
use adk_domain::{Repository, Result};

use crate::http::ConnectorConfig;

pub use v2::MgitV2Api;
pub use v4::MgitV4Api;

/// Protocol generation of the software component service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVariant {
    /// Legacy OData v2 service (`MANAGE_GIT_REPOSITORY`)
    OdataV2,
    /// OData v4 service with bound `SAP__self.*` actions
    OdataV4,
}

/// A connected driver for one software component, in either protocol
/// variant.
pub enum SoftwareComponentClient {
    V2(MgitV2Api),
    V4(MgitV4Api),
}

impl SoftwareComponentClient {
    /// Construct the driver for the requested variant and log into the
    /// backend (CSRF token + session cookies).
    pub async fn connect(
        variant: ApiVariant,
        config: ConnectorConfig,
        repository: Repository,
    ) -> Result<Self> {
        let mut client = match variant {
            ApiVariant::OdataV2 => Self::V2(MgitV2Api::new(config, repository)?),
            ApiVariant::OdataV4 => Self::V4(MgitV4Api::new(config, repository)?),
        };
        client.ensure_session().await?;
        Ok(client)
    }
}

#[async_trait]
impl SoftwareComponentApi for SoftwareComponentClient {
    async fn ensure_session(&mut self) -> Result<()> {
        match self {
            Self::V2(api) => api.ensure_session().await,
            Self::V4(api) => api.ensure_session().await,
        }
    }

    async fn trigger_clone(&mut self) -> Result<()> {
        match self {
            Self::V2(api) => api.trigger_clone().await,
            Self::V4(api) => api.trigger_clone().await,
        }
    }

    async fn trigger_pull(&mut self) -> Result<()> {
        match self {
            Self::V2(api) => api.trigger_pull().await,
            Self::V4(api) => api.trigger_pull().await,
        }
    }

    async fn trigger_checkout_branch(&mut self) -> Result<()> {
        match self {
            Self::V2(api) => api.trigger_checkout_branch().await,
            Self::V4(api) => api.trigger_checkout_branch().await,
        }
    }

    async fn create_tag(&mut self, tag: &Tag) -> Result<()> {
        match self {
            Self::V2(api) => api.create_tag(tag).await,
            Self::V4(api) => api.create_tag(tag).await,
        }
    }

    async fn repository_state(&mut self) -> Result<RepositoryState> {
        match self {
            Self::V2(api) => api.repository_state().await,
            Self::V4(api) => api.repository_state().await,
        }
    }

    async fn action_status(&mut self) -> Result<ActionStatus> {
        match self {
            Self::V2(api) => api.action_status().await,
            Self::V4(api) => api.action_status().await,
        }
    }

    async fn log_overview(&mut self) -> Result<Vec<LogOverviewEntry>> {
        match self {
            Self::V2(api) => api.log_overview().await,
            Self::V4(api) => api.log_overview().await,
        }
    }

    async fn log_protocol(
        &mut self,
        entry: &LogOverviewEntry,
        page: usize,
    ) -> Result<(Vec<LogProtocolLine>, usize)> {
        match self {
            Self::V2(api) => api.log_protocol(entry, page).await,
            Self::V4(api) => api.log_protocol(entry, page).await,
        }
    }

    async fn execution_log(&mut self) -> Result<Vec<ExecutionLogEntry>> {
        match self {
            Self::V2(api) => api.execution_log().await,
            Self::V4(api) => api.execution_log().await,
        }
    }

    fn action_uuid(&self) -> &str {
        match self {
            Self::V2(api) => api.action_uuid(),
            Self::V4(api) => api.action_uuid(),
        }
    }

    fn convert_time(&self, raw: &str) -> DateTime<Utc> {
        match self {
            Self::V2(api) => api.convert_time(raw),
            Self::V4(api) => api.convert_time(raw),
        }
    }
}

/// Escape the component name for use inside a URL: namespace slashes are
/// sent percent-encoded.
pub(crate) fn escape_component_name(name: &str) -> String {
    name.replace('/', "%2F")
}
