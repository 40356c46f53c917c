//! Driver for the OData v4 software component service.
//!
//! Uses collection URLs with bound `SAP__self.*` actions, reads actions
//! from the `Actions` collection and paginates the protocol with
//! `$count=true`. Trigger requests are retried with Fibonacci pacing for
//! a small whitelist of backend error codes (component locked / busy).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use adk_common::resilience::{FibonacciBackoff, RetryDecision, RetryPolicy};
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

/// Root path of the OData v4 service.
pub const SERVICE_PATH: &str =
    "/sap/opu/odata4/sap/a4c_mswc_api/srvd_a2x/sap/manage_software_components/0001";

const SOFTWARE_COMPONENTS_ENTITY: &str = "/SoftwareComponents";
const ACTIONS_ENTITY: &str = "/Actions";
const BRANCHES_ENTITY: &str = "/Branches";
const TAGS_ENTITY: &str = "/Tags";
const CLONE_ACTION: &str = "/SAP__self.clone";
const PULL_ACTION: &str = "/SAP__self.pull";
const CHECKOUT_ACTION: &str = "/SAP__self.checkout_branch";

/// Backend error codes that allow a trigger retry.
pub const DEFAULT_RETRY_CODES: [&str; 2] = ["A4C_A2G/228", "A4C_A2G/501"];

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry gate: only errors carrying a whitelisted backend code qualify.
struct AllowedErrorCodes {
    codes: Vec<String>,
}

impl RetryPolicy<AdkError> for AllowedErrorCodes {
    fn should_retry(&self, error: &AdkError, _attempt: u32) -> RetryDecision {
        match error.wire_code() {
            Some(code) if self.codes.iter().any(|allowed| allowed == code) => {
                RetryDecision::Retry
            }
            _ => RetryDecision::Stop,
        }
    }
}

#[derive(Serialize)]
struct CheckoutBody<'a> {
    import_mode: &'a str,
    execution_mode: &'a str,
}

#[derive(Serialize)]
struct CreateTagBody<'a> {
    sc_name: &'a str,
    commit_id: &'a str,
    tag_name: &'a str,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProtocolPage {
    #[serde(default)]
    value: Vec<LogProtocolLine>,
    #[serde(default, rename = "@odata.count")]
    count: usize,
}

/// Driver for one software component on the OData v4 service.
pub struct MgitV4Api {
    connector: Connector,
    repository: Repository,
    uuid: String,
    backoff: FibonacciBackoff,
    max_retries: u32,
    retry_policy: AllowedErrorCodes,
}

impl MgitV4Api {
    pub fn new(config: ConnectorConfig, repository: Repository) -> Result<Self> {
        Ok(Self {
            connector: Connector::new(config)?,
            repository,
            uuid: String::new(),
            backoff: FibonacciBackoff::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_policy: AllowedErrorCodes {
                codes: DEFAULT_RETRY_CODES.iter().map(ToString::to_string).collect(),
            },
        })
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Override the retry pacing (time unit and sleep ceiling).
    pub fn set_retry_pacing(&mut self, unit: Duration, max: Duration) {
        self.backoff = FibonacciBackoff::new(unit, max);
    }

    /// Override the retry attempt cap.
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries;
    }

    /// Attach bring-your-own-git credentials for the next clone trigger.
    pub fn set_byog_credentials(
        &mut self,
        auth_method: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) {
        self.repository.set_byog_credentials(auth_method, username, password);
    }

    fn component_segment(&self) -> String {
        format!("/{}", escape_component_name(&self.repository.name))
    }

    fn require_name(&self) -> Result<()> {
        if self.repository.name.is_empty() {
            return Err(AdkError::Config(
                "An empty string was passed for the parameter 'repositoryName'".to_string(),
            ));
        }
        Ok(())
    }

    /// Fire a trigger request, retrying whitelisted backend errors with
    /// Fibonacci pacing. The loop ends on success, a non-retryable
    /// error, the attempt cap, or an exhausted sleep budget - whichever
    /// comes first.
    async fn trigger(&mut self, suffix: &str, body: &str) -> Result<()> {
        let mut last_error: Option<AdkError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let Ok(delay) = self.backoff.delay(attempt + 5) else {
                    // reached max retry duration
                    break;
                };
                info!(delay = ?delay, "Retrying");
                tokio::time::sleep(delay).await;
            }

            match self.connector.post(suffix, body).await {
                Ok(response) => {
                    let entity = envelope::v4_entity::<ActionEntity>(&response)
                        .and_then(|entity| {
                            envelope::reject_empty(entity, ActionEntity::is_empty)
                        });
                    return match entity {
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
                    };
                }
                Err(err) => {
                    let decision = self.retry_policy.should_retry(&err, attempt);
                    last_error = Some(err);
                    if decision == RetryDecision::Stop {
                        break;
                    }
                }
            }
        }

        self.uuid.clear();
        Err(last_error.unwrap_or(AdkError::EmptyResponse))
    }
}

#[async_trait]
impl SoftwareComponentApi for MgitV4Api {
    /// A HEAD against the service root would succeed even unauthorized;
    /// the token request therefore reads the Actions collection without
    /// fetching data.
    async fn ensure_session(&mut self) -> Result<()> {
        self.connector
            .fetch_csrf_token(Method::GET, &format!("{SERVICE_PATH}{ACTIONS_ENTITY}?$top=0"))
            .await
    }

    async fn trigger_clone(&mut self) -> Result<()> {
        self.require_name()?;
        let suffix = format!(
            "{SERVICE_PATH}{SOFTWARE_COMPONENTS_ENTITY}{}{CLONE_ACTION}",
            self.component_segment()
        );
        let body = self.repository.clone_body(false)?;
        self.trigger(&suffix, &body).await
    }

    async fn trigger_pull(&mut self) -> Result<()> {
        self.require_name()?;
        let suffix = format!(
            "{SERVICE_PATH}{SOFTWARE_COMPONENTS_ENTITY}{}{PULL_ACTION}",
            self.component_segment()
        );
        let body = self.repository.pull_body()?;
        self.trigger(&suffix, &body).await
    }

    async fn trigger_checkout_branch(&mut self) -> Result<()> {
        if self.repository.name.is_empty() || self.repository.branch.is_empty() {
            return Err(AdkError::Config(
                "Repository and/or Branch Configuration is empty. Please make sure that you have specified the correct values"
                    .to_string(),
            ));
        }
        let suffix = format!(
            "{SERVICE_PATH}{BRANCHES_ENTITY}{}/{}{CHECKOUT_ACTION}",
            self.component_segment(),
            self.repository.branch,
        );
        let body = serde_json::to_string(&CheckoutBody { import_mode: "", execution_mode: "" })
            .map_err(|err| AdkError::Parse(err.to_string()))?;
        self.trigger(&suffix, &body).await
    }

    async fn create_tag(&mut self, tag: &Tag) -> Result<()> {
        if tag.is_empty() {
            return Err(AdkError::Config("No Tag provided".to_string()));
        }
        let body = serde_json::to_string(&CreateTagBody {
            sc_name: &self.repository.name,
            commit_id: &self.repository.commit_id,
            tag_name: &tag.name,
            description: &tag.description,
        })
        .map_err(|err| AdkError::Parse(err.to_string()))?;
        self.trigger(&format!("{SERVICE_PATH}{TAGS_ENTITY}"), &body).await
    }

    async fn repository_state(&mut self) -> Result<RepositoryState> {
        self.require_name()?;
        let response = self
            .connector
            .get(&format!(
                "{SERVICE_PATH}{SOFTWARE_COMPONENTS_ENTITY}{}",
                self.component_segment()
            ))
            .await?;
        let entity = envelope::v4_entity::<RepositoryEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, RepositoryEntity::is_empty))?;

        if entity.avail_on_inst {
            return Ok(RepositoryState {
                cloned: true,
                active_branch: entity.active_branch,
                byog: false,
            });
        }
        Ok(RepositoryState {
            cloned: false,
            active_branch: String::new(),
            byog: !entity.byog_url.is_empty(),
        })
    }

    async fn action_status(&mut self) -> Result<ActionStatus> {
        let response =
            self.connector.get(&format!("{SERVICE_PATH}{ACTIONS_ENTITY}/{}", self.uuid)).await?;
        let entity = envelope::v4_entity::<ActionEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, ActionEntity::is_empty))?;

        self.uuid = entity.uuid;
        let status = entity.status.ok_or(AdkError::EmptyResponse)?;
        info!("Status: {} - {}", status.code(), entity.status_description);
        Ok(status)
    }

    async fn log_overview(&mut self) -> Result<Vec<LogOverviewEntry>> {
        let response = self
            .connector
            .get(&format!("{SERVICE_PATH}{ACTIONS_ENTITY}/{}/_Log_Overview", self.uuid))
            .await?;
        envelope::v4_collection(&response)
    }

    async fn log_protocol(
        &mut self,
        entry: &LogOverviewEntry,
        page: usize,
    ) -> Result<(Vec<LogProtocolLine>, usize)> {
        let suffix = format!(
            "{SERVICE_PATH}{ACTIONS_ENTITY}/{}/_Log_Overview/{}/_Log_Protocol?$skip={}&$top={}&$count=true",
            self.uuid,
            entry.index,
            page * ENTRIES_PER_PAGE,
            ENTRIES_PER_PAGE,
        );
        let response = self.connector.get(&suffix).await?;
        let body: ProtocolPage = envelope::v4_entity(&response)?;
        Ok((body.value, body.count))
    }

    async fn execution_log(&mut self) -> Result<Vec<ExecutionLogEntry>> {
        let response = self
            .connector
            .get(&format!("{SERVICE_PATH}{ACTIONS_ENTITY}/{}/_Execution_log", self.uuid))
            .await?;
        envelope::v4_collection(&response)
    }

    fn action_uuid(&self) -> &str {
        &self.uuid
    }

    /// Timestamps arrive as RFC 3339, e.g. `2024-05-02T09:25:40Z`.
    fn convert_time(&self, raw: &str) -> DateTime<Utc> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(timestamp) => timestamp.with_timezone(&Utc),
            Err(_) => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}
