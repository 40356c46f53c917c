//! The OData connector - a thin, stateful wrapper around reqwest.
//!
//! One connector talks to one backend: it owns the base URL, the basic
//! auth credentials, the cookie jar and the CSRF token. Components never
//! share a connector instance; drivers own theirs exclusively.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use tracing::debug;

use adk_domain::{AdkError, Result};

use crate::odata;

/// Name of the CSRF token header used by the ABAP backends.
pub const CSRF_TOKEN_HEADER: &str = "x-csrf-token";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Connection parameters for one backend endpoint.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Extra URL parameters appended to every request (e.g.
    /// `sap-client=100`, `$format=json`), before any suffix-specific
    /// query string.
    pub parameters: Vec<(String, String)>,
    /// Additional trusted root certificates, PEM-encoded.
    pub trusted_certificates: Vec<Vec<u8>>,
    /// Overall per-request deadline.
    pub timeout: Duration,
}

impl ConnectorConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            parameters: Vec::new(),
            trusted_certificates: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    pub fn with_trusted_certificate(mut self, pem: Vec<u8>) -> Self {
        self.trusted_certificates.push(pem);
        self
    }
}

/// HTTP connector with cookie jar and CSRF token handling.
#[derive(Debug, Clone)]
pub struct Connector {
    client: reqwest::Client,
    config: ConnectorConfig,
    csrf_token: Option<String>,
}

impl Connector {
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .default_headers(headers);
        for pem in &config.trusted_certificates {
            let certificate = reqwest::Certificate::from_pem(pem).map_err(|err| {
                AdkError::Config(format!("Could not read a trusted certificate: {err}"))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|err| AdkError::Config(format!("Could not create the HTTP client: {err}")))?;

        Ok(Self { client, config, csrf_token: None })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Store a CSRF token for subsequent state-changing requests.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.csrf_token = Some(token.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Compose the request URL: base + suffix path, with the configured
    /// parameters placed before any suffix-specific query string.
    fn build_url(&self, suffix: &str) -> String {
        let (path, suffix_query) = match suffix.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (suffix, None),
        };

        let mut query_parts: Vec<String> = self
            .config
            .parameters
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect();
        if let Some(query) = suffix_query {
            query_parts.push(query.to_string());
        }

        let mut url = format!("{}{}", self.config.base_url, path);
        if !query_parts.is_empty() {
            url.push('?');
            url.push_str(&query_parts.join("&"));
        }
        url
    }

    /// Log into the backend: request a CSRF token via the given method and
    /// suffix, keeping the session cookies in the jar.
    pub async fn fetch_csrf_token(&mut self, method: Method, suffix: &str) -> Result<()> {
        let url = self.build_url(suffix);
        debug!(%url, "Fetching CSRF token");

        let response = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(CSRF_TOKEN_HEADER, "fetch")
            .send()
            .await
            .map_err(|err| odata::error::connection_failure(&err))?;

        let response = self.check_status(response).await?;
        let token = response
            .headers()
            .get(CSRF_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if token.is_empty() {
            return Err(AdkError::Config(
                "The backend did not provide a CSRF token".to_string(),
            ));
        }
        self.csrf_token = Some(token);
        Ok(())
    }

    /// GET `base + suffix`, returning the raw body on HTTP 2xx.
    pub async fn get(&self, suffix: &str) -> Result<String> {
        self.get_url(&self.build_url(suffix)).await
    }

    /// GET an absolute URL (used for deferred navigation links which
    /// already carry the full address).
    pub async fn get_url(&self, url: &str) -> Result<String> {
        let response = self.execute(Method::GET, url, None).await?;
        response.text().await.map_err(|err| AdkError::Parse(err.to_string()))
    }

    /// POST `base + suffix` with a JSON body. Requires a fetched token.
    pub async fn post(&self, suffix: &str, body: &str) -> Result<String> {
        self.require_token()?;
        let url = self.build_url(suffix);
        let response = self.execute(Method::POST, &url, Some(body.to_string())).await?;
        response.text().await.map_err(|err| AdkError::Parse(err.to_string()))
    }

    /// PUT raw bytes to `base + suffix` (artifact uploads). Requires a
    /// fetched token.
    pub async fn put_bytes(&self, suffix: &str, body: Vec<u8>) -> Result<()> {
        self.require_token()?;
        let url = self.build_url(suffix);
        let response = self
            .client
            .request(Method::PUT, &url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(CSRF_TOKEN_HEADER, self.csrf_token.clone().unwrap_or_default())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|err| odata::error::connection_failure(&err))?;
        self.check_status(response).await?;
        Ok(())
    }

    /// Download `base + suffix` into the given file.
    pub async fn download(&self, suffix: &str, target: &Path) -> Result<()> {
        let url = self.build_url(suffix);
        let response = self.execute(Method::GET, &url, None).await?;
        let payload =
            response.bytes().await.map_err(|err| AdkError::Parse(err.to_string()))?;
        tokio::fs::write(target, &payload)
            .await
            .map_err(|err| AdkError::Io(format!("Could not save {}: {err}", target.display())))
    }

    fn require_token(&self) -> Result<()> {
        if self.csrf_token.is_none() {
            return Err(AdkError::Config(
                "No CSRF token available - call fetch_csrf_token first".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, method: Method, url: &str, body: Option<String>) -> Result<Response> {
        debug!(%method, %url, "Sending request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response =
            request.send().await.map_err(|err| odata::error::connection_failure(&err))?;
        self.check_status(response).await
    }

    /// Pass 2xx responses through, translate everything else into a
    /// transport error carrying the ABAP error code.
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status: StatusCode = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let (code, message) = odata::error::translate_error_body(&body);
        Err(AdkError::Transport { code, status: status.as_u16(), message })
    }
}
