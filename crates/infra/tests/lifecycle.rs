//! End-to-end scenarios against mock backends: trigger an action, poll it
//! to a terminal state, retrieve the logs, and run the AAKaaS delivery
//! steps from descriptor to published target vector.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use adk_core::{evaluate_action_outcome, poll_action, PollConfig, SoftwareComponentApi};
use adk_domain::types::action::ActionStatus;
use adk_domain::types::target_vector::{PublishScope, TargetVector};
use adk_domain::{AddonDescriptor, Repository, Versionable};
use adk_infra::integrations::aakaas;
use adk_infra::{ApiVariant, Connector, ConnectorConfig, SoftwareComponentClient};

const V4_PATH: &str =
    "/sap/opu/odata4/sap/a4c_mswc_api/srvd_a2x/sap/manage_software_components/0001";
const V2_PATH: &str = "/sap/opu/odata/sap/MANAGE_GIT_REPOSITORY";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_poll() -> PollConfig {
    PollConfig { interval: Duration::from_millis(1), max_runtime: Duration::from_secs(5) }
}

fn test_repository() -> Repository {
    Repository {
        name: "/DMO/REPO".to_string(),
        branch: "main".to_string(),
        ..Repository::default()
    }
}

async fn mount_v4_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("{V4_PATH}/Actions")))
        .and(query_param("$top", "0"))
        .and(header("x-csrf-token", "fetch"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-csrf-token", "session-token"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn v4_clone_poll_and_logs() {
    init_tracing();
    let server = MockServer::start().await;
    mount_v4_session(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("{V4_PATH}/SoftwareComponents/%2FDMO%2FREPO/SAP__self.clone")))
        .and(header("x-csrf-token", "session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"uuid":"ACTION-1","status":"R","status_descr":"Queued for import"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_clone = polls.clone();
    Mock::given(method("GET"))
        .and(path(format!("{V4_PATH}/Actions/ACTION-1")))
        .respond_with(move |_request: &Request| {
            let body = if polls_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                r#"{"uuid":"ACTION-1","status":"R","status_descr":"Running"}"#
            } else {
                r#"{"uuid":"ACTION-1","status":"S","status_descr":"Imported"}"#
            };
            ResponseTemplate::new(200).set_body_string(body)
        })
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{V4_PATH}/Actions/ACTION-1/_Log_Overview")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"value":[
                {"log_index":2,"log_name":"Import","type_of_found_issues":"Success","timestamp":"2024-05-02T09:25:40Z"},
                {"log_index":1,"log_name":"Checks","type_of_found_issues":"Error","timestamp":"2024-05-02T09:20:00Z"}
            ]}"#,
        ))
        .mount(&server)
        .await;

    for index in [1, 2] {
        Mock::given(method("GET"))
            .and(path(format!(
                "{V4_PATH}/Actions/ACTION-1/_Log_Overview/{index}/_Log_Protocol"
            )))
            .and(query_param("$count", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"@odata.count":1,"value":[
                    {{"log_index":{index},"index_no":1,"type":"Info","descr":"phase {index} detail","timestamp":"2024-05-02T09:25:40Z"}}
                ]}}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path(format!("{V4_PATH}/Actions/ACTION-1/_Execution_log")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"value":[{"index_no":"1","type":"Info","descr":"started","timestamp":"2024-05-02T09:19:00Z"}]}"#,
        ))
        .mount(&server)
        .await;

    let mut client = SoftwareComponentClient::connect(
        ApiVariant::OdataV4,
        ConnectorConfig::new(server.uri(), "user", "password"),
        test_repository(),
    )
    .await
    .expect("connect");

    client.trigger_clone().await.expect("clone");
    assert_eq!(client.action_uuid(), "ACTION-1");

    let status = poll_action(&mut client, fast_poll()).await.expect("poll");
    assert_eq!(status, ActionStatus::Success);
    evaluate_action_outcome(status, true).expect("terminal evaluation");

    // the protocol of the failing phase (index 1) is fetched before the
    // succeeding one (index 2), in overview order
    let requests = server.received_requests().await.unwrap();
    let protocol_paths: Vec<String> = requests
        .iter()
        .map(|request| request.url.path().to_string())
        .filter(|p| p.contains("_Log_Protocol"))
        .collect();
    assert_eq!(protocol_paths.len(), 2);
    assert!(protocol_paths[0].contains("/_Log_Overview/1/"));
    assert!(protocol_paths[1].contains("/_Log_Overview/2/"));
}

#[tokio::test]
async fn v2_clone_poll_and_logs() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path(V2_PATH))
        .and(header("x-csrf-token", "fetch"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-csrf-token", "legacy-token"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{V2_PATH}/Clones")))
        .and(header("x-csrf-token", "legacy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"uuid":"ACTION-2","status":"R","status_descr":"Running"}}"#,
        ))
        .mount(&server)
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_clone = polls.clone();
    let base_uri = server.uri();
    Mock::given(method("GET"))
        .and(path(format!("{V2_PATH}/Pull(uuid=guid'ACTION-2')")))
        .respond_with(move |request: &Request| {
            if request.url.query().unwrap_or_default().contains("expand=to_Log_Overview") {
                let overview = format!(
                    r#"{{"d":{{"uuid":"ACTION-2","status":"W","status_descr":"Imported with warnings",
                        "to_Log_Overview":{{"results":[
                            {{"log_index":1,"log_name":"Import","type_of_found_issues":"Warning",
                              "timestamp":"/Date(1644332220000+0000)/",
                              "to_Log_Protocol":{{"__deferred":{{"uri":"{base_uri}/protocol/1"}}}}}}
                        ]}}}}}}"#,
                );
                return ResponseTemplate::new(200).set_body_string(overview);
            }
            let body = if polls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                r#"{"d":{"uuid":"ACTION-2","status":"R","status_descr":"Running"}}"#
            } else {
                r#"{"d":{"uuid":"ACTION-2","status":"W","status_descr":"Imported with warnings"}}"#
            };
            ResponseTemplate::new(200).set_body_string(body)
        })
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/protocol/1"))
        .and(query_param("$inlinecount", "allpages"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"results":[
                {"log_index":1,"index_no":1,"type":"Warning","descr":"import detail","timestamp":""}
            ],"__count":"1"}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = SoftwareComponentClient::connect(
        ApiVariant::OdataV2,
        ConnectorConfig::new(server.uri(), "user", "password"),
        test_repository(),
    )
    .await
    .expect("connect");

    client.trigger_clone().await.expect("clone");
    let status = poll_action(&mut client, fast_poll()).await.expect("poll");
    assert_eq!(status, ActionStatus::Warning);

    // warnings pass by default and promote to an error on request
    evaluate_action_outcome(status, false).expect("warning tolerated");
    evaluate_action_outcome(status, true).expect_err("warning promoted");
}

#[tokio::test]
async fn descriptor_to_published_target_vector() {
    init_tracing();
    let server = MockServer::start().await;

    // catalog: highest delivered patch of 1.3 is 0046
    Mock::given(method("GET"))
        .and(path("/odata/aas_ocs_package/xSSDAxC_Component_Version"))
        .and(query_param("$orderby", "TechPatchLevel desc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"results":[{"Name":"/DMO/COMP01","Version":"1.3.46","TechRelease":"1","TechSpLevel":"0003","TechPatchLevel":"0046"}]}}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/odata/aas_ocs_package"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-csrf-token", "aakaas-token"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/odata/aas_ocs_package/DeterminePackageForScv"))
        .and(query_param("Name", "'/DMO/COMP01'"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"DeterminePackageForScv":{
                "Name":"SAPK-001AAINDMO","Type":"AOI","ScName":"/DMO/COMP01",
                "PredecessorCommitId":"old-commit","Status":"P"
            }}}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/odata/aas_ocs_package/TargetVectorSet"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"Id":"TV-1","ProductName":"/DMO/PRODUCT1","Status":"G"}}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/odata/aas_ocs_package/PublishTargetVector"))
        .and(query_param("Id", "'TV-1'"))
        .and(query_param("Scope", "'T'"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"Id":"TV-1","Status":"G","PublishStatus":"R"}}"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/odata/aas_ocs_package/TargetVectorSet('TV-1')"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"d":{"Id":"TV-1","Status":"T","PublishStatus":"S"}}"#,
        ))
        .mount(&server)
        .await;

    let mut descriptor = AddonDescriptor::from_yaml(
        r#"
addonProduct: /DMO/PRODUCT1
addonVersion: 1.0.0
repositories:
  - name: /DMO/COMP01
    branch: main
    version: 1.3.NEXT
    commitID: new-commit
"#,
    )
    .expect("descriptor");
    descriptor.check_repositories().expect("valid descriptor");

    let mut connector =
        Connector::new(ConnectorConfig::new(server.uri(), "user", "password")).expect("connector");

    // resolve the component version wildcard
    let mut vers = Versionable::new(
        &descriptor.repositories[0].name,
        &descriptor.repositories[0].version_yaml,
    )
    .expect("versionable");
    aakaas::versionable::resolve_component_version(&mut vers, &connector)
        .await
        .expect("resolve");
    assert_eq!(vers.version, "1.3.47");

    {
        let repository = &mut descriptor.repositories[0];
        repository.version = vers.tech_release.clone();
        repository.sp_level = vers.tech_sp_level.clone();
        repository.patch_level = vers.tech_patch_level.clone();
    }

    // reserve the delivery package and copy the outcome back
    let mut package = aakaas::Package::from_repository(&descriptor.repositories[0]);
    package.reserve_next(&mut connector).await.expect("reserve");
    package
        .copy_fields_to_repository(&mut descriptor.repositories[0])
        .expect("copy back");
    assert_eq!(descriptor.repositories[0].package_name, "SAPK-001AAINDMO");
    assert_eq!(descriptor.repositories[0].status, "P");

    // assemble and publish the target vector
    descriptor.addon_version = "0001".to_string();
    descriptor.addon_sps_level = "0000".to_string();
    descriptor.addon_patch_level = "0000".to_string();

    let mut tv = TargetVector::init_new(&descriptor).expect("target vector");
    aakaas::target_vector::create(&mut tv, &mut connector).await.expect("create");
    assert_eq!(tv.id, "TV-1");

    aakaas::target_vector::publish(&mut tv, &mut connector, PublishScope::Test)
        .await
        .expect("publish");
    aakaas::target_vector::poll_for_status(&mut tv, &connector, PublishScope::Test, fast_poll())
        .await
        .expect("poll to published");
}
