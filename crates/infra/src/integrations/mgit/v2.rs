//! Driver for the legacy OData v2 software component service.
//!
//! Uses singular resource URLs: actions are read through the `Pull`
//! entity (`/Pull(uuid=guid'...')`), the log overview arrives expanded on
//! the action, and the protocol is reached through a deferred navigation
//! URI. Pull, branch checkout, tag creation and the execution log are not
//! offered by this generation; callers needing them use the v4 service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use adk_core::abap::logs::ENTRIES_PER_PAGE;
use adk_core::{RepositoryState, SoftwareComponentApi, Tag};
use adk_domain::types::action::{
    ActionEntity, ActionStatus, ExecutionLogEntry, LogOverviewEntry, LogProtocolLine,
    RepositoryEntity,
};
use adk_domain::{AdkError, Repository, Result};

use crate::http::{Connector, ConnectorConfig};
use crate::odata::envelope;

use super::escape_component_name;

/// Root path of the OData v2 service.
pub const SERVICE_PATH: &str = "/sap/opu/odata/sap/MANAGE_GIT_REPOSITORY";

const CLONES_ENTITY: &str = "/Clones";
const REPOSITORIES_ENTITY: &str = "/Repositories";
const PULL_ENTITY: &str = "/Pull";

#[derive(Debug, Deserialize)]
struct ProtocolPage {
    #[serde(default)]
    results: Vec<LogProtocolLine>,
    #[serde(default, rename = "__count")]
    count: String,
}

/// Driver for one software component on the OData v2 service.
pub struct MgitV2Api {
    connector: Connector,
    repository: Repository,
    uuid: String,
}

impl MgitV2Api {
    pub fn new(config: ConnectorConfig, repository: Repository) -> Result<Self> {
        Ok(Self { connector: Connector::new(config)?, repository, uuid: String::new() })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    fn repo_key(&self) -> String {
        format!("('{}')", escape_component_name(&self.repository.name))
    }

    fn action_url(&self) -> String {
        format!("{SERVICE_PATH}{PULL_ENTITY}(uuid=guid'{}')", self.uuid)
    }

    fn require_name(&self) -> Result<()> {
        if self.repository.name.is_empty() {
            return Err(AdkError::Config(
                "An empty string was passed for the parameter 'repositoryName'".to_string(),
            ));
        }
        Ok(())
    }

    async fn trigger(&mut self, suffix: &str, body: &str) -> Result<()> {
        let response = match self.connector.post(suffix, body).await {
            Ok(response) => response,
            Err(err) => {
                self.uuid.clear();
                return Err(err);
            }
        };

        let entity = envelope::v2_entity::<ActionEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, ActionEntity::is_empty));
        match entity {
            Ok(entity) => {
                self.uuid = entity.uuid;
                info!(
                    repository = %self.repository.name,
                    branch = %self.repository.branch,
                    uuid = %self.uuid,
                    "Triggered action of Repository / Software Component"
                );
                Ok(())
            }
            Err(err) => {
                self.uuid.clear();
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SoftwareComponentApi for MgitV2Api {
    async fn ensure_session(&mut self) -> Result<()> {
        self.connector.fetch_csrf_token(Method::HEAD, SERVICE_PATH).await
    }

    async fn trigger_clone(&mut self) -> Result<()> {
        self.require_name()?;
        let body = self.repository.clone_body(true)?;
        self.trigger(&format!("{SERVICE_PATH}{CLONES_ENTITY}"), &body).await
    }

    async fn trigger_pull(&mut self) -> Result<()> {
        Err(AdkError::NotSupported("pull of a software component".to_string()))
    }

    async fn trigger_checkout_branch(&mut self) -> Result<()> {
        Err(AdkError::NotSupported("branch checkout".to_string()))
    }

    async fn create_tag(&mut self, _tag: &Tag) -> Result<()> {
        Err(AdkError::NotSupported("tag creation".to_string()))
    }

    async fn repository_state(&mut self) -> Result<RepositoryState> {
        self.require_name()?;
        let response = self
            .connector
            .get(&format!("{SERVICE_PATH}{REPOSITORIES_ENTITY}{}", self.repo_key()))
            .await?;
        let entity = envelope::v2_entity::<RepositoryEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, RepositoryEntity::is_empty))?;

        if entity.avail_on_inst {
            return Ok(RepositoryState {
                cloned: true,
                active_branch: entity.active_branch,
                byog: false,
            });
        }
        Ok(RepositoryState::default())
    }

    async fn action_status(&mut self) -> Result<ActionStatus> {
        let response = self.connector.get(&self.action_url()).await?;
        let entity = envelope::v2_entity::<ActionEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, ActionEntity::is_empty))?;

        self.uuid = entity.uuid;
        let status = entity.status.ok_or(AdkError::EmptyResponse)?;
        info!("Status: {} - {}", status.code(), entity.status_description);
        Ok(status)
    }

    async fn log_overview(&mut self) -> Result<Vec<LogOverviewEntry>> {
        let response = self
            .connector
            .get(&format!("{}?$expand=to_Log_Overview", self.action_url()))
            .await?;
        let entity = envelope::v2_entity::<ActionEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, ActionEntity::is_empty))?;
        Ok(entity.to_log_overview.map(|overview| overview.results).unwrap_or_default())
    }

    async fn log_protocol(
        &mut self,
        entry: &LogOverviewEntry,
        page: usize,
    ) -> Result<(Vec<LogProtocolLine>, usize)> {
        let deferred = entry
            .to_log_protocol
            .as_ref()
            .ok_or_else(|| {
                AdkError::Parse("Log overview entry carries no protocol URI".to_string())
            })?
            .deferred
            .uri
            .clone();
        let url = format!(
            "{deferred}?$skip={}&$top={}&$inlinecount=allpages",
            page * ENTRIES_PER_PAGE,
            ENTRIES_PER_PAGE,
        );

        let response = self.connector.get_url(&url).await?;
        let body: ProtocolPage = envelope::v2_entity(&response)?;
        let count = body.count.parse::<usize>().unwrap_or(0);
        Ok((body.results, count))
    }

    async fn execution_log(&mut self) -> Result<Vec<ExecutionLogEntry>> {
        Err(AdkError::NotSupported("execution log".to_string()))
    }

    fn action_uuid(&self) -> &str {
        &self.uuid
    }

    /// Timestamps arrive as `/Date(1585576807000+0000)/`.
    fn convert_time(&self, raw: &str) -> DateTime<Utc> {
        let seconds = raw
            .strip_prefix("/Date(")
            .and_then(|rest| rest.strip_suffix("000+0000)/"))
            .and_then(|seconds| seconds.parse::<i64>().ok());
        match seconds.and_then(|seconds| DateTime::from_timestamp(seconds, 0)) {
            Some(timestamp) => timestamp,
            None => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
