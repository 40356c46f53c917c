//! Polling an asynchronous action to its terminal state.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use adk_domain::types::action::ActionStatus;
use adk_domain::{AdkError, Result};

use super::logs;
use super::ports::SoftwareComponentApi;

/// Pacing of a poll loop: the wait between status requests and the
/// cumulative runtime after which polling gives up.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_runtime: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(10), max_runtime: Duration::from_secs(30 * 60) }
    }
}

/// Poll the in-flight action until it reaches a terminal state, then
/// print its logs and return the final status.
///
/// The in-flight action on the server is not canceled on expiry; the
/// driver merely stops observing it.
pub async fn poll_action<A>(api: &mut A, config: PollConfig) -> Result<ActionStatus>
where
    A: SoftwareComponentApi + ?Sized,
{
    info!("Start polling the status...");
    let deadline = Instant::now() + config.max_runtime;

    loop {
        if Instant::now() >= deadline {
            return Err(AdkError::Timeout("status of the repository action".to_string()));
        }
        tokio::time::sleep(config.interval).await;

        let status = api.action_status().await?;
        if status.is_terminal() {
            logs::print_logs(api).await;
            return Ok(status);
        }
    }
}

/// Classify a terminal action status from the caller's point of view.
///
/// `S` succeeds; `W` succeeds unless warnings are promoted to errors;
/// `E` and `A` fail. Non-terminal states fail as well, since callers
/// only evaluate after polling completed.
pub fn evaluate_action_outcome(
    status: ActionStatus,
    treat_warnings_as_error: bool,
) -> Result<()> {
    match status {
        ActionStatus::Success => Ok(()),
        ActionStatus::Warning if !treat_warnings_as_error => {
            warn!("The action finished with warnings");
            Ok(())
        }
        ActionStatus::Warning => Err(AdkError::Semantic(
            "The action finished with warnings and warnings are treated as errors".to_string(),
        )),
        ActionStatus::Aborted => {
            Err(AdkError::Semantic("The action was aborted on the ABAP system".to_string()))
        }
        ActionStatus::Error => {
            Err(AdkError::Semantic("The action failed on the ABAP system".to_string()))
        }
        ActionStatus::Running | ActionStatus::Queued => Err(AdkError::Semantic(
            "The action did not reach a terminal state".to_string(),
        )),
    }
}
