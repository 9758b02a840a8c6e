//! Address book service HTTP client
//!
//! Wraps `reqwest::Client` with the headers every request to the service
//! carries, JSON handling, and a short request-level retry for transport
//! errors and 5xx responses.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use addrsync_cloud::client::CloudClient;
//! use addrsync_core::{config::CloudConfig, ports::{DeviceInfo, IAuthDelegate}};
//!
//! # async fn example(auth: Arc<dyn IAuthDelegate>) -> Result<(), addrsync_cloud::CloudError> {
//! let client = CloudClient::new(&CloudConfig::default(), auth, &DeviceInfo::new("DSN-1"))?;
//! let response = client.send(reqwest::Method::GET, "/accounts", &[], None).await?;
//! println!("status {}", response.status);
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use addrsync_core::{
    config::CloudConfig,
    ports::{DeviceInfo, HttpResponse, IAuthDelegate},
};
use reqwest::{
    header::{ACCEPT, USER_AGENT},
    Client, Method, RequestBuilder,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::CloudError;

const HEADER_MARKETPLACE: &str = "Accept-PFM";
const HEADER_REQUEST_ID: &str = "X-Amzn-RequestId";
const HEADER_CLIENT_ID: &str = "X-Amzn-ClientId";

/// HTTP client for the address book service
pub struct CloudClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Source of bearer tokens
    auth: Arc<dyn IAuthDelegate>,
    /// Device serial number, sent as the client id
    client_id: String,
    marketplace: String,
    user_agent: String,
    /// Extra attempts after a transport error or 5xx
    retry_count: u32,
    retry_delay: Duration,
}

impl CloudClient {
    /// Creates a client from the `cloud` configuration section
    ///
    /// # Errors
    /// Returns [`CloudError::Network`] if the TLS backend cannot be initialized.
    pub fn new(
        config: &CloudConfig,
        auth: Arc<dyn IAuthDelegate>,
        device: &DeviceInfo,
    ) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint.clone(),
            auth,
            client_id: device.serial_number.clone(),
            marketplace: config.preferred_marketplace.clone(),
            user_agent: config.user_agent.clone(),
            retry_count: config.http_retry_count,
            retry_delay: Duration::from_millis(config.http_retry_delay_ms),
        })
    }

    /// Points the client at a different base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Builds a request with authentication and the common headers
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, CloudError> {
        let token = self
            .auth
            .auth_token()
            .filter(|token| !token.is_empty())
            .ok_or(CloudError::MissingToken)?;

        Ok(self
            .client
            .request(method, self.url(path))
            .bearer_auth(token)
            .header(HEADER_MARKETPLACE, &self.marketplace)
            .header(HEADER_REQUEST_ID, Uuid::new_v4().to_string())
            .header(HEADER_CLIENT_ID, &self.client_id)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json"))
    }

    /// Sends a request and returns whatever HTTP response the service gave.
    ///
    /// Transport errors and 5xx responses are retried up to the configured
    /// count; the final 5xx is returned as a response, the final transport
    /// error as `Err`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, CloudError> {
        let mut attempt = 0;
        loop {
            let mut builder = self.request(method.clone(), path)?;
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < self.retry_count {
                        warn!(
                            %method,
                            path,
                            status = status.as_u16(),
                            attempt,
                            "Server error, retrying request"
                        );
                    } else {
                        let text = response.text().await?;
                        debug!(%method, path, status = status.as_u16(), "Request completed");
                        return Ok(HttpResponse::new(status.as_u16(), text));
                    }
                }
                Err(err) if attempt < self.retry_count => {
                    warn!(%method, path, attempt, error = %err, "Transport error, retrying request");
                }
                Err(err) => return Err(err.into()),
            }

            attempt += 1;
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// GETs `path` and deserializes a successful JSON response
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        let response = self.send(Method::GET, path, query, None).await?;
        ensure_success(&response)?;
        parse_json(&response)
    }
}

/// Fails with [`CloudError::Http`] unless the status is 200 or 201
pub(crate) fn ensure_success(response: &HttpResponse) -> Result<(), CloudError> {
    match response.status {
        200 | 201 => Ok(()),
        status => Err(CloudError::Http {
            status,
            body: response.body.clone(),
        }),
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, CloudError> {
    serde_json::from_str(&response.body).map_err(|e| CloudError::InvalidResponse(e.to_string()))
}
