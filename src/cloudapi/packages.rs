//! Packages service for the CloudAPI client

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::require_id;
use crate::cloudapi::types::{Package, PackageRef};
use crate::error::Result;
use tracing::instrument;

/// Service for the provisioning packages visible to an account
#[derive(Debug, Clone)]
pub struct PackagesService {
    http: HttpClient,
    account: String,
}

impl PackagesService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    /// List the available packages
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<Package>> {
        let path = format!("/{}/packages", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get a package by name or previously returned package
    #[instrument(skip(self, package), level = "debug")]
    pub async fn get(&self, package: impl PackageRef) -> Result<Package> {
        let name = package.package_name();
        require_id("package name", name)?;

        let path = format!("/{}/packages/{}", self.account, name);
        self.http.get(&path, GetOptions::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::cloudapi::types::HttpOptions;
    use mockito::Server;

    fn service(server: &Server) -> PackagesService {
        let credentials = Credentials::basic("admin", "secret").unwrap();
        let mut http = HttpClient::new("http://localhost", credentials, HttpOptions::default())
            .unwrap();
        http.set_base_url(server.url());
        PackagesService::new(http, "admin".to_string())
    }

    #[tokio::test]
    async fn test_list_packages() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/packages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name": "regular_128", "memory": 128, "disk": 5120, "default": true}]"#,
            )
            .create_async()
            .await;

        let packages = service(&server).list().await.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "regular_128");
        assert_eq!(packages[0].memory, Some(128));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_package() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/packages/regular_128")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "regular_128", "memory": 128}"#)
            .create_async()
            .await;

        let package = service(&server).get("regular_128").await.unwrap();
        assert_eq!(package.name, "regular_128");

        mock_server.assert_async().await;
    }
}
