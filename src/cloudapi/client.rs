//! Client implementation for the CloudAPI SDK
//!
//! This module provides the main entry point for interacting with the
//! datacenter API. It selects the authentication mode at construction and
//! provides access to the per-resource services.

use crate::auth::Credentials;
use crate::cloudapi::account::AccountService;
use crate::cloudapi::analytics::AnalyticsService;
use crate::cloudapi::datacenters::DatacentersService;
use crate::cloudapi::datasets::DatasetsService;
use crate::cloudapi::http::HttpClient;
use crate::cloudapi::keys::KeysService;
use crate::cloudapi::machines::MachinesService;
use crate::cloudapi::packages::PackagesService;
use crate::cloudapi::require_id;
use crate::cloudapi::types::HttpOptions;
use crate::error::Result;

/// Client for the datacenter API
///
/// This is the main entry point for the CloudAPI SDK. Construction parses
/// and validates the supplied credentials, so a bad key or an empty
/// credential pair fails here rather than on the first request. Cloning is
/// cheap and shares the connection pool and the response cache.
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    account: String,
}

impl Client {
    /// Create a client using HTTP Basic authentication
    pub fn with_basic_auth(
        url: &str,
        account: &str,
        login: &str,
        password: &str,
    ) -> Result<Self> {
        Self::with_basic_auth_and_options(url, account, login, password, HttpOptions::default())
    }

    /// Create a client using HTTP Basic authentication with custom options
    pub fn with_basic_auth_and_options(
        url: &str,
        account: &str,
        login: &str,
        password: &str,
        options: HttpOptions,
    ) -> Result<Self> {
        require_id("account", account)?;
        let credentials = Credentials::basic(login, password)?;

        Ok(Self {
            http: HttpClient::new(url, credentials, options)?,
            account: account.to_string(),
        })
    }

    /// Create a client using HTTP Signature authentication
    ///
    /// `key_name` is the name of an SSH key on the account;
    /// `private_key_pem` is the matching RSA private key in PEM form.
    pub fn with_key_auth(
        url: &str,
        account: &str,
        key_name: &str,
        private_key_pem: &str,
    ) -> Result<Self> {
        Self::with_key_auth_and_options(
            url,
            account,
            key_name,
            private_key_pem,
            HttpOptions::default(),
        )
    }

    /// Create a client using HTTP Signature authentication with custom
    /// options
    pub fn with_key_auth_and_options(
        url: &str,
        account: &str,
        key_name: &str,
        private_key_pem: &str,
        options: HttpOptions,
    ) -> Result<Self> {
        require_id("account", account)?;
        require_id("key name", key_name)?;

        let key_id = format!("/{}/keys/{}", account, key_name);
        let credentials = Credentials::signature(key_id, private_key_pem)?;

        Ok(Self {
            http: HttpClient::new(url, credentials, options)?,
            account: account.to_string(),
        })
    }

    /// The account name requests operate on
    pub fn account_name(&self) -> &str {
        &self.account
    }

    /// A client scoped to another account
    ///
    /// Paths are built against the new account while the signing identity
    /// stays with the credential owner. The connection pool and cache are
    /// shared with the original client.
    pub fn for_account(&self, account: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            account: account.into(),
        }
    }

    /// Access the account service
    pub fn account(&self) -> AccountService {
        AccountService::new(self.http.clone(), self.account.clone())
    }

    /// Access the SSH keys service
    pub fn keys(&self) -> KeysService {
        KeysService::new(self.http.clone(), self.account.clone())
    }

    /// Access the machines service
    pub fn machines(&self) -> MachinesService {
        MachinesService::new(self.http.clone(), self.account.clone())
    }

    /// Access the packages service
    pub fn packages(&self) -> PackagesService {
        PackagesService::new(self.http.clone(), self.account.clone())
    }

    /// Access the datasets service
    pub fn datasets(&self) -> DatasetsService {
        DatasetsService::new(self.http.clone(), self.account.clone())
    }

    /// Access the datacenters service
    pub fn datacenters(&self) -> DatacentersService {
        DatacentersService::new(self.http.clone(), self.account.clone())
    }

    /// Access the analytics service
    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self.http.clone(), self.account.clone())
    }
}

#[cfg(test)]
impl Client {
    /// Point the client at a test server (for testing only)
    pub(crate) fn set_base_url(&mut self, url: String) {
        self.http.set_base_url(url);
    }
}
