//! Target vector lifecycle in AAKaaS: create, publish, poll.

use reqwest::Method;
use tokio::time::Instant;
use tracing::info;

use adk_core::PollConfig;
use adk_domain::types::target_vector::{PublishScope, PublishStatus, TargetVector};
use adk_domain::{AdkError, Result};

use crate::http::Connector;
use crate::odata::envelope;

use super::SERVICE_PATH;

fn is_empty_tv(tv: &TargetVector) -> bool {
    tv.id.is_empty() && tv.status.is_none()
}

/// Create the target vector in AAKaaS; stores the returned ID and
/// initial status.
pub async fn create(tv: &mut TargetVector, connector: &mut Connector) -> Result<()> {
    ensure_token(connector).await?;

    let payload = serde_json::to_string(tv)
        .map_err(|err| AdkError::Parse(format!("Could not serialize the target vector: {err}")))?;
    let response = connector.post(&format!("{SERVICE_PATH}/TargetVectorSet"), &payload).await?;
    let created = envelope::v2_entity::<TargetVector>(&response)
        .and_then(|entity| envelope::reject_empty(entity, is_empty_tv))?;

    tv.id = created.id;
    tv.status = created.status;
    info!(id = %tv.id, "Created target vector");
    Ok(())
}

/// Trigger publishing of the target vector to the given scope.
pub async fn publish(
    tv: &mut TargetVector,
    connector: &mut Connector,
    scope: PublishScope,
) -> Result<()> {
    ensure_token(connector).await?;

    let suffix = format!(
        "{SERVICE_PATH}/PublishTargetVector?Id='{}'&Scope='{}'",
        urlencoding::encode(&tv.id),
        scope.code(),
    );
    let response = connector.post(&suffix, "").await?;
    let published = envelope::v2_entity::<TargetVector>(&response)
        .and_then(|entity| envelope::reject_empty(entity, is_empty_tv))?;

    tv.status = published.status;
    tv.publish_status = published.publish_status;
    Ok(())
}

/// Refresh status and publish status of the target vector.
pub async fn get(tv: &mut TargetVector, connector: &Connector) -> Result<()> {
    if tv.id.is_empty() {
        return Err(AdkError::Config(
            "Without an ID no target vector details can be obtained from AAKaaS".to_string(),
        ));
    }
    let suffix =
        format!("{SERVICE_PATH}/TargetVectorSet('{}')", urlencoding::encode(&tv.id));
    let response = connector.get(&suffix).await?;
    let current = envelope::v2_entity::<TargetVector>(&response)
        .and_then(|entity| envelope::reject_empty(entity, is_empty_tv))?;

    tv.status = current.status;
    tv.publish_status = current.publish_status;
    Ok(())
}

/// Poll AAKaaS until the publish operation reaches a final state, then
/// check that the target vector ended up in the expected status.
///
/// A successful publish into the wrong status keeps polling (the backend
/// may still promote the vector) and surfaces as an error only on
/// expiry.
pub async fn poll_for_status(
    tv: &mut TargetVector,
    connector: &Connector,
    scope: PublishScope,
    config: PollConfig,
) -> Result<()> {
    let deadline = Instant::now() + config.max_runtime;
    let mut cached_error: Option<AdkError> = None;

    loop {
        if Instant::now() >= deadline {
            return Err(cached_error.unwrap_or_else(|| {
                AdkError::Timeout("AAKaaS target vector status change".to_string())
            }));
        }
        tokio::time::sleep(config.interval).await;

        get(tv, connector).await?;
        match tv.publish_status {
            Some(PublishStatus::Running) => continue,
            Some(PublishStatus::Success) => {
                if tv.status == Some(scope.expected_status()) {
                    return Ok(());
                }
                let reached = tv.status.map(|status| status.code()).unwrap_or_default();
                cached_error = Some(AdkError::Semantic(format!(
                    "Publishing of target vector {} resulted in state {} instead of expected state {}",
                    tv.id,
                    reached,
                    scope.expected_status().code(),
                )));
            }
            Some(PublishStatus::Error) => {
                return Err(AdkError::Semantic(format!(
                    "Publishing of target vector {} failed in AAKaaS",
                    tv.id,
                )));
            }
            None => {
                return Err(AdkError::Parse(
                    "Polling returned no target vector publish status".to_string(),
                ));
            }
        }
    }
}

async fn ensure_token(connector: &mut Connector) -> Result<()> {
    if connector.token().is_none() {
        connector.fetch_csrf_token(Method::HEAD, SERVICE_PATH).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use adk_domain::types::target_vector::TargetVectorStatus;

    use crate::http::ConnectorConfig;

    use super::*;

    const TV_ID: &str = "W7Q00207512600000353";

    fn tv_body(status: &str, publish_status: &str) -> String {
        format!(
            r#"{{"d":{{"Id":"{TV_ID}","ProductName":"/DMO/PRD01","ProductVersion":"0001",
                "SpsLevel":"0000","PatchLevel":"0000","Status":"{status}","PublishStatus":"{publish_status}"}}}}"#
        )
    }

    async fn mock_token(server: &MockServer) {
        Mock::given(method("HEAD"))
            .and(path(SERVICE_PATH))
            .respond_with(ResponseTemplate::new(200).insert_header("x-csrf-token", "token"))
            .mount(server)
            .await;
    }

    fn connector_for(server: &MockServer) -> Connector {
        Connector::new(ConnectorConfig::new(server.uri(), "user", "password")).unwrap()
    }

    #[tokio::test]
    async fn create_stores_id_and_status() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{SERVICE_PATH}/TargetVectorSet")))
            .respond_with(ResponseTemplate::new(200).set_body_string(tv_body("G", "")))
            .mount(&server)
            .await;

        let mut connector = connector_for(&server);
        let mut tv = TargetVector {
            product_name: "/DMO/PRD01".to_string(),
            product_version: "0001".to_string(),
            sps_level: "0000".to_string(),
            patch_level: "0000".to_string(),
            ..TargetVector::default()
        };
        create(&mut tv, &mut connector).await.expect("create");
        assert_eq!(tv.id, TV_ID);
        assert_eq!(tv.status, Some(TargetVectorStatus::Generated));
    }

    #[tokio::test]
    async fn publish_records_the_publish_status() {
        let server = MockServer::start().await;
        mock_token(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("{SERVICE_PATH}/PublishTargetVector")))
            .and(query_param("Id", format!("'{TV_ID}'")))
            .and(query_param("Scope", "'T'"))
            .respond_with(ResponseTemplate::new(200).set_body_string(tv_body("G", "R")))
            .mount(&server)
            .await;

        let mut connector = connector_for(&server);
        let mut tv = TargetVector::init_existing(TV_ID);
        publish(&mut tv, &mut connector, PublishScope::Test).await.expect("publish");
        assert_eq!(tv.publish_status, Some(PublishStatus::Running));
    }

    #[tokio::test]
    async fn poll_succeeds_when_the_expected_status_is_reached() {
        let server = MockServer::start().await;
        let polls = Arc::new(AtomicUsize::new(0));
        let polls_clone = polls.clone();
        Mock::given(method("GET"))
            .and(path(format!("{SERVICE_PATH}/TargetVectorSet('{TV_ID}')")))
            .respond_with(move |_request: &Request| {
                let body = if polls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    tv_body("G", "R")
                } else {
                    tv_body("T", "S")
                };
                ResponseTemplate::new(200).set_body_string(body)
            })
            .mount(&server)
            .await;

        let connector = connector_for(&server);
        let mut tv = TargetVector::init_existing(TV_ID);
        poll_for_status(
            &mut tv,
            &connector,
            PublishScope::Test,
            PollConfig { interval: Duration::from_millis(1), max_runtime: Duration::from_secs(5) },
        )
        .await
        .expect("poll");
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn poll_reports_an_unexpected_final_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(tv_body("P", "S")))
            .mount(&server)
            .await;

        let connector = connector_for(&server);
        let mut tv = TargetVector::init_existing(TV_ID);
        let err = poll_for_status(
            &mut tv,
            &connector,
            PublishScope::Test,
            PollConfig { interval: Duration::from_millis(1), max_runtime: Duration::from_millis(30) },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("instead of expected state"));
    }

    #[tokio::test]
    async fn poll_fails_fast_on_publish_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(tv_body("G", "E")))
            .mount(&server)
            .await;

        let connector = connector_for(&server);
        let mut tv = TargetVector::init_existing(TV_ID);
        let err = poll_for_status(
            &mut tv,
            &connector,
            PublishScope::Test,
            PollConfig { interval: Duration::from_millis(1), max_runtime: Duration::from_secs(5) },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed in AAKaaS"));
    }

    #[tokio::test]
    async fn get_requires_an_id() {
        let server = MockServer::start().await;
        let connector = connector_for(&server);
        let mut tv = TargetVector::default();
        assert!(matches!(get(&mut tv, &connector).await, Err(AdkError::Config(_))));
    }
}
