//! SSH keys service for the CloudAPI client

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::require_id;
use crate::cloudapi::types::{KeyRef, SshKey};
use crate::error::Result;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, instrument};

/// Request for registering an SSH key
#[derive(Debug, Serialize)]
struct CreateKeyRequest<'a> {
    name: &'a str,
    key: &'a str,
}

/// Service for the SSH keys attached to an account
#[derive(Debug, Clone)]
pub struct KeysService {
    http: HttpClient,
    account: String,
}

impl KeysService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    /// Register an SSH public key on the account
    #[instrument(skip(self, openssh_key), level = "debug")]
    pub async fn create(&self, name: &str, openssh_key: &str) -> Result<SshKey> {
        require_id("key name", name)?;
        require_id("key", openssh_key)?;

        let path = format!("/{}/keys", self.account);
        let request = CreateKeyRequest {
            name,
            key: openssh_key,
        };

        debug!("Registering key {}", name);
        self.http
            .post(&path, &[], &request, Some(StatusCode::CREATED))
            .await
    }

    /// List the SSH keys on the account
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<SshKey>> {
        let path = format!("/{}/keys", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get an SSH key by name or previously returned key
    #[instrument(skip(self, key), level = "debug")]
    pub async fn get(&self, key: impl KeyRef) -> Result<SshKey> {
        let name = key.key_name();
        require_id("key name", name)?;

        let path = format!("/{}/keys/{}", self.account, name);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Delete an SSH key
    #[instrument(skip(self, key), level = "debug")]
    pub async fn delete(&self, key: impl KeyRef) -> Result<()> {
        let name = key.key_name();
        require_id("key name", name)?;

        let path = format!("/{}/keys/{}", self.account, name);

        debug!("Deleting key {}", name);
        self.http.del(&path, Some(StatusCode::NO_CONTENT)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::cloudapi::types::HttpOptions;
    use crate::error::Error;
    use mockito::Server;

    fn service(server: &Server) -> KeysService {
        let credentials = Credentials::basic("admin", "secret").unwrap();
        let mut http = HttpClient::new("http://localhost", credentials, HttpOptions::default())
            .unwrap();
        http.set_base_url(server.url());
        KeysService::new(http, "admin".to_string())
    }

    #[tokio::test]
    async fn test_create_key() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin/keys")
            .match_body(mockito::Matcher::JsonString(
                r#"{"name": "laptop", "key": "ssh-rsa AAAA..."}"#.to_string(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "laptop", "key": "ssh-rsa AAAA..."}"#)
            .create_async()
            .await;

        let key = service(&server)
            .create("laptop", "ssh-rsa AAAA...")
            .await
            .unwrap();
        assert_eq!(key.name, "laptop");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_key_rejects_empty_name() {
        let server = Server::new_async().await;
        let result = service(&server).create("", "ssh-rsa AAAA...").await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_list_keys() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/keys")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "laptop", "key": "ssh-rsa AAAA..."}]"#)
            .create_async()
            .await;

        let keys = service(&server).list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "laptop");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_key_accepts_previously_returned_object() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/keys/laptop")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "laptop", "key": "ssh-rsa AAAA..."}"#)
            .expect(1)
            .create_async()
            .await;

        let service = service(&server);
        let key = service.get("laptop").await.unwrap();

        // Passing the returned key back resolves to the same path, which
        // the cache now serves without a second request.
        let again = service.get(&key).await.unwrap();
        assert_eq!(again.name, "laptop");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_key() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("DELETE", "/admin/keys/laptop")
            .with_status(204)
            .create_async()
            .await;

        service(&server).delete("laptop").await.unwrap();

        mock_server.assert_async().await;
    }
}
