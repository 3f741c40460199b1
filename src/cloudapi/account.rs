//! Account service for the CloudAPI client

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::types::{Account, UpdateAccountOptions};
use crate::error::Result;
use tracing::{debug, instrument};

/// Service for account details
#[derive(Debug, Clone)]
pub struct AccountService {
    http: HttpClient,
    account: String,
}

impl AccountService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    /// Get the account details
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self) -> Result<Account> {
        let path = format!("/{}", self.account);

        debug!("Fetching account {}", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Update the account details
    #[instrument(skip(self, options), level = "debug")]
    pub async fn update(&self, options: UpdateAccountOptions) -> Result<Account> {
        let path = format!("/{}", self.account);

        debug!("Updating account {}", self.account);
        self.http.post(&path, &[], &options, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::cloudapi::types::HttpOptions;
    use mockito::Server;

    fn service(server: &Server) -> AccountService {
        let credentials = Credentials::basic("admin", "secret").unwrap();
        let mut http = HttpClient::new("http://localhost", credentials, HttpOptions::default())
            .unwrap();
        http.set_base_url(server.url());
        AccountService::new(http, "admin".to_string())
    }

    #[tokio::test]
    async fn test_get_account() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"login": "admin", "email": "admin@example.com"}"#)
            .create_async()
            .await;

        let account = service(&server).get().await.unwrap();
        assert_eq!(account.login, "admin");
        assert_eq!(account.email, "admin@example.com");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_account() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin")
            .match_body(mockito::Matcher::JsonString(
                r#"{"email": "ops@example.com"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"login": "admin", "email": "ops@example.com"}"#)
            .create_async()
            .await;

        let options = UpdateAccountOptions::new().with_email("ops@example.com");
        let account = service(&server).update(options).await.unwrap();
        assert_eq!(account.email, "ops@example.com");

        mock_server.assert_async().await;
    }
}
