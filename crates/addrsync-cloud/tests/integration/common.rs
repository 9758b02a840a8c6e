//! Shared test helpers for address book service integration tests
//!
//! Provides a static auth delegate and wiremock mounts for the account
//! endpoints every address book call depends on.

use std::sync::Arc;

use addrsync_cloud::RestCloudAgent;
use addrsync_core::{
    config::ConfigBuilder,
    ports::{AuthState, DeviceInfo, IAuthDelegate, IAuthObserver},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PCE_ID: &str = "pce-test-001";
pub const COMMS_ID: &str = "comms-test-001";
pub const DEVICE_SERIAL: &str = "DSN-TEST";

/// Auth delegate handing out a fixed token
pub struct StaticAuth(pub Option<String>);

impl IAuthDelegate for StaticAuth {
    fn auth_token(&self) -> Option<String> {
        self.0.clone()
    }
    fn auth_state(&self) -> AuthState {
        AuthState::Refreshed
    }
    fn add_auth_observer(&self, _observer: Arc<dyn IAuthObserver>) {}
    fn remove_auth_observer(&self, _observer: &Arc<dyn IAuthObserver>) {}
}

/// Builds an agent against `server` with the given number of HTTP retries
pub fn agent_with_retries(server: &MockServer, retries: u32) -> RestCloudAgent {
    agent_with_auth(server, retries, Some("test-access-token"))
}

pub fn agent_with_auth(server: &MockServer, retries: u32, token: Option<&str>) -> RestCloudAgent {
    let config = ConfigBuilder::new()
        .cloud_endpoint(server.uri())
        .cloud_http_retry_count(retries)
        .cloud_http_retry_delay_ms(10)
        .build();

    RestCloudAgent::new(
        &config.cloud,
        Arc::new(StaticAuth(token.map(str::to_string))),
        &DeviceInfo::new(DEVICE_SERIAL),
    )
    .expect("build agent")
}

/// Starts a mock server with a provisioned signed-in account and returns
/// it together with an agent that does not retry.
pub async fn setup_provisioned() -> (MockServer, RestCloudAgent) {
    let server = MockServer::start().await;
    mount_provisioned_account(&server).await;
    let agent = agent_with_retries(&server, 0);
    (server, agent)
}

/// Mounts `GET /accounts` and `GET /users/{commsId}/identities` for a
/// provisioned account.
pub async fn mount_provisioned_account(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "commsId": "comms-other",
                "directedId": "directed-other",
                "signedInUser": false,
                "commsProvisionStatus": "PROVISIONED"
            },
            {
                "commsId": COMMS_ID,
                "directedId": "directed-test-001",
                "signedInUser": true,
                "commsProvisionStatus": "PROVISIONED"
            }
        ])))
        .mount(server)
        .await;

    mount_identity(server).await;
}

pub async fn mount_identity(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{COMMS_ID}/identities")))
        .and(query_param("includeUserName", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "commsId": COMMS_ID,
            "pceId": PCE_ID
        })))
        .mount(server)
        .await;
}

pub fn address_books_path() -> String {
    format!("/users/{PCE_ID}/addressbooks")
}
