//! PAPI client implementation
//!
//! A deliberately thin client for the internal Packages API: package CRUD
//! over plain HTTP with optional Basic authentication. No response cache
//! and no request signing; internal services sit behind the firewall.

use crate::error::{Error, Result, api_error};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// A package record as stored by PAPI
///
/// PAPI keys packages by UUID, unlike the public API which exposes them
/// by name.
#[derive(Debug, Clone, Deserialize)]
pub struct PapiPackage {
    /// Package identifier
    pub uuid: String,

    /// Package name
    pub name: String,

    pub version: Option<String>,

    /// Whether the package can be provisioned
    pub active: Option<bool>,

    /// Memory in MiB
    pub max_physical_memory: Option<u64>,

    /// Disk quota in MiB
    pub quota: Option<u64>,

    /// CPU cap in percent
    pub cpu_cap: Option<u64>,

    /// Accounts allowed to use the package
    #[serde(default)]
    pub owner_uuids: Vec<String>,
}

/// Fields for creating or updating a package
#[derive(Debug, Clone, Default, Serialize)]
pub struct PapiPackageSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_physical_memory: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cap: Option<u64>,
}

impl PapiPackageSpec {
    /// Create an empty spec
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the package name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set whether the package can be provisioned
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Set the memory size in MiB
    pub fn with_max_physical_memory(mut self, memory: u64) -> Self {
        self.max_physical_memory = Some(memory);
        self
    }
}

/// Client for the internal Packages API
#[derive(Debug, Clone)]
pub struct Client {
    client: ReqwestClient,
    base_url: String,
    authorization: Option<String>,
}

impl Client {
    /// Create a client with no authentication
    pub fn new(url: &str) -> Result<Self> {
        Self::build(url, None)
    }

    /// Create a client using HTTP Basic authentication
    pub fn with_basic_auth(url: &str, login: &str, password: &str) -> Result<Self> {
        if login.is_empty() || password.is_empty() {
            return Err(Error::Auth(
                "login and password must be non-empty".to_string(),
            ));
        }

        let token = STANDARD.encode(format!("{}:{}", login, password));
        Self::build(url, Some(format!("Basic {}", token)))
    }

    fn build(url: &str, authorization: Option<String>) -> Result<Self> {
        Url::parse(url).map_err(|e| Error::InvalidRequest(format!("invalid base URL: {}", e)))?;

        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            authorization,
        })
    }

    /// List packages, optionally filtered by field values
    #[instrument(skip(self, filter), level = "debug")]
    pub async fn list_packages(&self, filter: &[(String, String)]) -> Result<Vec<PapiPackage>> {
        let mut request = self.request(reqwest::Method::GET, "/packages");
        if !filter.is_empty() {
            request = request.query(filter);
        }

        debug!("Listing packages");
        self.execute(request, None).await
    }

    /// Get a package by UUID
    #[instrument(skip(self), level = "debug")]
    pub async fn get_package(&self, uuid: &str) -> Result<PapiPackage> {
        if uuid.is_empty() {
            return Err(Error::InvalidRequest("package uuid must be non-empty".to_string()));
        }

        let request = self.request(reqwest::Method::GET, &format!("/packages/{}", uuid));
        self.execute(request, None).await
    }

    /// Create a package
    #[instrument(skip(self, spec), level = "debug")]
    pub async fn create_package(&self, spec: &PapiPackageSpec) -> Result<PapiPackage> {
        let request = self.request(reqwest::Method::POST, "/packages").json(spec);

        debug!("Creating package");
        self.execute(request, Some(StatusCode::CREATED)).await
    }

    /// Update a package
    #[instrument(skip(self, spec), level = "debug")]
    pub async fn update_package(&self, uuid: &str, spec: &PapiPackageSpec) -> Result<PapiPackage> {
        if uuid.is_empty() {
            return Err(Error::InvalidRequest("package uuid must be non-empty".to_string()));
        }

        let request = self
            .request(reqwest::Method::PUT, &format!("/packages/{}", uuid))
            .json(spec);

        debug!("Updating package {}", uuid);
        self.execute(request, None).await
    }

    /// Delete a package
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_package(&self, uuid: &str) -> Result<()> {
        if uuid.is_empty() {
            return Err(Error::InvalidRequest("package uuid must be non-empty".to_string()));
        }

        let request = self.request(reqwest::Method::DELETE, &format!("/packages/{}", uuid));

        debug!("Deleting package {}", uuid);
        let response = request.send().await.map_err(Error::Http)?;
        let status = response.status();

        if status != StatusCode::NO_CONTENT {
            let text = response.text().await.map_err(Error::Http)?;
            return Err(api_error(status, &text));
        }

        Ok(())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json");

        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization);
        }

        request
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        expected: Option<StatusCode>,
    ) -> Result<T> {
        let response = request.send().await.map_err(Error::Http)?;
        let status = response.status();
        let text = response.text().await.map_err(Error::Http)?;

        let ok = match expected {
            Some(exp) => status == exp,
            None => status.is_success(),
        };
        if !ok {
            return Err(api_error(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| Error::UnexpectedResponse(format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
impl Client {
    /// Point the client at a test server (for testing only)
    pub(crate) fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}
