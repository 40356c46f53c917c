//! Client for the ABAP build framework (`BUILD/CORE_SRV`).
//!
//! A build run is started with a phase and a list of input values, then
//! polled to its final run state. Tasks, values, logs and results are
//! fetched lazily and cached on the build; result artifacts can be
//! downloaded into the workspace.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{error, info, warn};

use adk_domain::types::build::{BuildValue, MessageType, ResultState, RunState};
use adk_domain::{AdkError, Result};

use crate::http::Connector;
use crate::odata::envelope;

/// Reserved result name of the sentinel task carrying no real artifact.
pub const DUMMY_RESULT_NAME: &str = "Dummy";

#[derive(Serialize)]
struct StartBody<'a> {
    phase: &'a str,
    values: &'a [BuildValue],
}

#[derive(Debug, Default, Deserialize)]
struct BuildEntity {
    #[serde(default)]
    build_id: String,
    #[serde(default)]
    run_state: Option<RunState>,
    #[serde(default, deserialize_with = "adk_domain::types::wire::empty_string_as_none")]
    result_state: Option<ResultState>,
    #[serde(default)]
    phase: String,
    #[serde(default)]
    entitytype: String,
    #[serde(default)]
    startedby: String,
    #[serde(default)]
    started_at: String,
    #[serde(default)]
    finished_at: String,
}

impl BuildEntity {
    fn is_empty(&self) -> bool {
        self.build_id.is_empty() && self.run_state.is_none()
    }
}

/// One task of a build run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub task_id: i32,
    #[serde(default)]
    pub log_id: String,
    #[serde(default)]
    pub plugin_class: String,
    #[serde(default, deserialize_with = "adk_domain::types::wire::empty_string_as_none")]
    pub result_state: Option<ResultState>,
    #[serde(skip)]
    pub logs: Vec<BuildLogLine>,
    #[serde(skip)]
    pub results: Vec<BuildResult>,
}

/// One log line of a build task.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildLogLine {
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub task_id: i32,
    #[serde(default)]
    pub msgty: Option<MessageType>,
    #[serde(default, rename = "log_line")]
    pub log_line: String,
    #[serde(default, rename = "TIME_STMP")]
    pub timestamp: String,
}

impl BuildLogLine {
    fn print(&self) {
        match self.msgty {
            Some(MessageType::Info) => info!(timestamp = %self.timestamp, "{}", self.log_line),
            Some(MessageType::Warning) => {
                warn!(timestamp = %self.timestamp, "{}", self.log_line);
            }
            Some(MessageType::Error) | Some(MessageType::Aborted) => {
                error!(timestamp = %self.timestamp, "{}", self.log_line);
            }
            None => {}
        }
    }
}

/// One result artifact of a build task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildResult {
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub task_id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub mimetype: String,
    /// File name the artifact was saved under (set after download).
    #[serde(skip)]
    pub saved_filename: Option<String>,
    /// Path the artifact was downloaded to (set after download).
    #[serde(skip)]
    pub download_path: Option<PathBuf>,
}

/// A build run on the build framework.
pub struct Build {
    connector: Connector,
    pub build_id: String,
    pub run_state: Option<RunState>,
    pub result_state: Option<ResultState>,
    pub phase: String,
    pub entity_type: String,
    pub started_by: String,
    pub started_at: String,
    pub finished_at: String,
    pub tasks: Vec<Task>,
    pub values: Vec<BuildValue>,
}

impl Build {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            build_id: String::new(),
            run_state: None,
            result_state: None,
            phase: String::new(),
            entity_type: String::new(),
            started_by: String::new(),
            started_at: String::new(),
            finished_at: String::new(),
            tasks: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Start a build run for the given phase with the input value list.
    pub async fn start(&mut self, phase: &str, values: &[BuildValue]) -> Result<()> {
        if self.connector.token().is_none() {
            self.connector.fetch_csrf_token(Method::HEAD, "").await?;
        }

        let body = serde_json::to_string(&StartBody { phase, values })
            .map_err(|err| AdkError::Parse(err.to_string()))?;
        let response = self.connector.post("/builds", &body).await?;
        let entity = envelope::v2_entity::<BuildEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, BuildEntity::is_empty))?;

        self.adopt(entity);
        info!(build_id = %self.build_id, phase = %self.phase, "Build started");
        Ok(())
    }

    /// Refresh run state and result state.
    pub async fn get(&mut self) -> Result<()> {
        let response =
            self.connector.get(&format!("/builds('{}')", self.build_id)).await?;
        let entity = envelope::v2_entity::<BuildEntity>(&response)
            .and_then(|entity| envelope::reject_empty(entity, BuildEntity::is_empty))?;
        self.adopt(entity);
        Ok(())
    }

    fn adopt(&mut self, entity: BuildEntity) {
        if !entity.build_id.is_empty() {
            self.build_id = entity.build_id;
        }
        self.run_state = entity.run_state;
        self.result_state = entity.result_state;
        self.phase = entity.phase;
        self.entity_type = entity.entitytype;
        self.started_by = entity.startedby;
        self.started_at = entity.started_at;
        self.finished_at = entity.finished_at;
    }

    /// Whether the run state is final.
    pub fn is_finished(&self) -> bool {
        self.run_state.is_some_and(RunState::is_final)
    }

    /// Poll the build until it is finished or failed, or the runtime
    /// budget expires.
    pub async fn poll(&mut self, max_runtime: Duration, interval: Duration) -> Result<()> {
        let deadline = Instant::now() + max_runtime;
        loop {
            if Instant::now() >= deadline {
                return Err(AdkError::Timeout("build did not reach a final state".to_string()));
            }
            tokio::time::sleep(interval).await;

            self.get().await?;
            if self.is_finished() {
                return Ok(());
            }
        }
    }

    /// Evaluate the final state. `Failed`, `Erroneous` and `Aborted` are
    /// errors; `Warning` is an error iff the flag is set.
    pub fn ended_with_error(&self, treat_warnings_as_error: bool) -> Result<()> {
        if self.run_state == Some(RunState::Failed) {
            return Err(AdkError::Semantic("The build framework run failed".to_string()));
        }
        match self.result_state {
            Some(state @ (ResultState::Erroneous | ResultState::Aborted)) => {
                Err(AdkError::Semantic(format!(
                    "The build ended with result state {state:?}"
                )))
            }
            Some(ResultState::Warning) if treat_warnings_as_error => Err(AdkError::Semantic(
                "The build ended with warnings and warnings are treated as errors".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Fetch the task list once, sorted ascending by task id.
    pub async fn fetch_tasks(&mut self) -> Result<()> {
        if !self.tasks.is_empty() {
            return Ok(());
        }
        let response =
            self.connector.get(&format!("/builds('{}')/tasks", self.build_id)).await?;
        let mut tasks: Vec<Task> = envelope::v2_results(&response)?;
        tasks.sort_by_key(|task| task.task_id);
        self.tasks = tasks;
        Ok(())
    }

    /// Fetch the build values once.
    pub async fn fetch_values(&mut self) -> Result<()> {
        if !self.values.is_empty() {
            return Ok(());
        }
        let response =
            self.connector.get(&format!("/builds('{}')/values", self.build_id)).await?;
        self.values = envelope::v2_results(&response)?;
        Ok(())
    }

    /// Fetch the logs of every task.
    pub async fn fetch_logs(&mut self) -> Result<()> {
        self.fetch_tasks().await?;
        for index in 0..self.tasks.len() {
            self.fetch_task_logs(index).await?;
        }
        Ok(())
    }

    /// Fetch all logs and render them at the level of their message type.
    pub async fn print_logs(&mut self) -> Result<()> {
        self.fetch_logs().await?;
        for task in &self.tasks {
            for line in &task.logs {
                line.print();
            }
        }
        Ok(())
    }

    /// Fetch the results of every task.
    pub async fn fetch_results(&mut self) -> Result<()> {
        self.fetch_tasks().await?;
        for index in 0..self.tasks.len() {
            self.fetch_task_results(index).await?;
        }
        Ok(())
    }

    async fn fetch_task_logs(&mut self, index: usize) -> Result<()> {
        if !self.tasks[index].logs.is_empty() {
            return Ok(());
        }
        let suffix = format!(
            "/tasks(build_id='{}',task_id={})/logs",
            self.build_id, self.tasks[index].task_id,
        );
        let response = self.connector.get(&suffix).await?;
        self.tasks[index].logs = envelope::v2_results(&response)?;
        Ok(())
    }

    async fn fetch_task_results(&mut self, index: usize) -> Result<()> {
        if !self.tasks[index].results.is_empty() {
            return Ok(());
        }
        let suffix = format!(
            "/tasks(build_id='{}',task_id={})/results",
            self.build_id, self.tasks[index].task_id,
        );
        let response = self.connector.get(&suffix).await?;
        self.tasks[index].results = envelope::v2_results(&response)?;
        Ok(())
    }

    /// The single result with the given name. Zero or several matches
    /// are errors.
    pub async fn get_result(&mut self, name: &str) -> Result<BuildResult> {
        self.fetch_results().await?;
        let mut matches = self
            .tasks
            .iter()
            .flat_map(|task| task.results.iter())
            .filter(|result| result.name == name);

        match (matches.next(), matches.next()) {
            (None, _) => {
                Err(AdkError::Semantic(format!("No result named {name} was found")))
            }
            (Some(result), None) => Ok(result.clone()),
            (Some(_), Some(_)) => Err(AdkError::Semantic(format!(
                "More than one result with the name {name} was found"
            ))),
        }
    }

    /// Download one result artifact to the given path.
    pub async fn download_result(&self, result: &BuildResult, target: &Path) -> Result<()> {
        let suffix = format!(
            "/results(build_id='{}',task_id={},name='{}')/$value",
            result.build_id, result.task_id, result.name,
        );
        self.connector.download(&suffix, target).await
    }

    /// Download every real result artifact, skipping the sentinel task
    /// whose single result is named `Dummy`. Artifacts are saved as
    /// `<prefix><name>` under the base name of `base_path`.
    pub async fn download_all_results(
        &mut self,
        base_path: &Path,
        filename_prefix: &str,
    ) -> Result<()> {
        self.fetch_results().await?;

        let directory: PathBuf =
            base_path.file_name().map(PathBuf::from).unwrap_or_default();

        for task_index in 0..self.tasks.len() {
            let is_sentinel = self.tasks[task_index].results.len() == 1
                && self.tasks[task_index].results[0].name == DUMMY_RESULT_NAME;
            if is_sentinel {
                continue;
            }
            for result_index in 0..self.tasks[task_index].results.len() {
                let result = self.tasks[task_index].results[result_index].clone();
                let filename = format!("{filename_prefix}{}", result.name);
                let target = directory.join(&filename);
                self.download_result(&result, &target).await?;
                info!(result = %result.name, path = %target.display(), "Downloaded build result");

                let slot = &mut self.tasks[task_index].results[result_index];
                slot.saved_filename = Some(filename);
                slot.download_path = Some(target);
            }
        }
        Ok(())
    }
}
