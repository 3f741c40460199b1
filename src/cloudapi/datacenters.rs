//! Datacenters service for the CloudAPI client

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::require_id;
use crate::cloudapi::types::Datacenters;
use crate::error::{Error, Result};
use tracing::instrument;

/// Service for datacenter discovery
#[derive(Debug, Clone)]
pub struct DatacentersService {
    http: HttpClient,
    account: String,
}

impl DatacentersService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    /// List the known datacenters and their endpoint URLs
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Datacenters> {
        let path = format!("/{}/datacenters", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Resolve a datacenter name to its endpoint URL
    ///
    /// The name is resolved against the fetched listing; an unknown name
    /// fails without issuing a second request.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, name: &str) -> Result<String> {
        require_id("datacenter name", name)?;

        let datacenters = self.list().await?;
        datacenters.get(name).cloned().ok_or_else(|| {
            Error::InvalidRequest(format!("unknown datacenter: {}", name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::cloudapi::types::HttpOptions;
    use mockito::Server;

    fn service(server: &Server) -> DatacentersService {
        let credentials = Credentials::basic("admin", "secret").unwrap();
        let mut http = HttpClient::new("http://localhost", credentials, HttpOptions::default())
            .unwrap();
        http.set_base_url(server.url());
        DatacentersService::new(http, "admin".to_string())
    }

    #[tokio::test]
    async fn test_get_datacenter_resolves_url() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/datacenters")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"us-west-1": "https://us-west-1.api.example.com"}"#)
            .create_async()
            .await;

        let url = service(&server).get("us-west-1").await.unwrap();
        assert_eq!(url, "https://us-west-1.api.example.com");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_unknown_datacenter_fails_locally() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/datacenters")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"us-west-1": "https://us-west-1.api.example.com"}"#)
            .expect(1)
            .create_async()
            .await;

        let result = service(&server).get("eu-central-9").await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));

        // Only the listing request went out.
        mock_server.assert_async().await;
    }
}
