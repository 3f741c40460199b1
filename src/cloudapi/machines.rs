//! Machines service for the CloudAPI client
//!
//! Covers the machine lifecycle (provision, start, stop, reboot, resize,
//! delete) plus the per-machine metadata, tag, and snapshot collections.
//! Lifecycle actions are dispatched as `POST /:account/machines/:id` with
//! an `action` query parameter and are acknowledged with HTTP 202.

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::require_id;
use crate::cloudapi::types::{
    CreateMachineOptions, ListMachinesOptions, Machine, MachineRef, Metadata, PackageRef,
    Snapshot, Tags,
};
use crate::error::Result;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, instrument};

/// Request for creating a machine snapshot
#[derive(Debug, Serialize)]
struct CreateSnapshotRequest<'a> {
    name: &'a str,
}

/// Service for machines and their sub-resources
#[derive(Debug, Clone)]
pub struct MachinesService {
    http: HttpClient,
    account: String,
}

impl MachinesService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    fn machine_path(&self, machine: &str) -> String {
        format!("/{}/machines/{}", self.account, machine)
    }

    /// Provision a new machine
    #[instrument(skip(self, options), level = "debug")]
    pub async fn create(&self, options: CreateMachineOptions) -> Result<Machine> {
        let path = format!("/{}/machines", self.account);

        debug!("Provisioning machine");
        self.http
            .post(&path, &[], &options, Some(StatusCode::CREATED))
            .await
    }

    /// List machines matching the given filters
    #[instrument(skip(self, options), level = "debug")]
    pub async fn list(&self, options: ListMachinesOptions) -> Result<Vec<Machine>> {
        let path = format!("/{}/machines", self.account);
        let opts = GetOptions {
            query: options.to_query(),
            ..GetOptions::default()
        };
        self.http.get(&path, opts).await
    }

    /// Count machines matching the given filters without fetching them
    #[instrument(skip(self, options), level = "debug")]
    pub async fn count(&self, options: ListMachinesOptions) -> Result<u64> {
        let path = format!("/{}/machines", self.account);
        self.http.head_count(&path, &options.to_query()).await
    }

    /// Get a machine by id or previously returned machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn get(&self, machine: impl MachineRef) -> Result<Machine> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        self.http
            .get(&self.machine_path(id), GetOptions::default())
            .await
    }

    /// Start a stopped machine
    pub async fn start(&self, machine: impl MachineRef) -> Result<()> {
        self.action(machine.machine_id(), "start", Vec::new()).await
    }

    /// Stop a running machine
    pub async fn stop(&self, machine: impl MachineRef) -> Result<()> {
        self.action(machine.machine_id(), "stop", Vec::new()).await
    }

    /// Reboot a running machine
    pub async fn reboot(&self, machine: impl MachineRef) -> Result<()> {
        self.action(machine.machine_id(), "reboot", Vec::new()).await
    }

    /// Resize a machine to a different package
    pub async fn resize(
        &self,
        machine: impl MachineRef,
        package: impl PackageRef,
    ) -> Result<()> {
        let package = package.package_name();
        require_id("package name", package)?;

        self.action(
            machine.machine_id(),
            "resize",
            vec![("package".to_string(), package.to_string())],
        )
        .await
    }

    /// Delete a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete(&self, machine: impl MachineRef) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        debug!("Deleting machine {}", id);
        self.http
            .del(&self.machine_path(id), Some(StatusCode::NO_CONTENT))
            .await
    }

    /// Dispatch a lifecycle action against a machine
    #[instrument(skip(self, extra), level = "debug")]
    async fn action(&self, machine: &str, action: &str, extra: Vec<(String, String)>) -> Result<()> {
        require_id("machine id", machine)?;

        let mut query = vec![("action".to_string(), action.to_string())];
        query.extend(extra);

        debug!("Machine {} action {}", machine, action);
        self.http
            .post(
                &self.machine_path(machine),
                &query,
                &serde_json::json!({}),
                Some(StatusCode::ACCEPTED),
            )
            .await
    }

    /// Get the metadata of a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn metadata(&self, machine: impl MachineRef) -> Result<Metadata> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/metadata", self.machine_path(id));
        self.http.get(&path, GetOptions::default()).await
    }

    /// Add or replace metadata entries on a machine
    #[instrument(skip(self, machine, metadata), level = "debug")]
    pub async fn update_metadata(
        &self,
        machine: impl MachineRef,
        metadata: Metadata,
    ) -> Result<Metadata> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/metadata", self.machine_path(id));
        self.http.post(&path, &[], &metadata, None).await
    }

    /// Delete one metadata entry from a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete_metadata(&self, machine: impl MachineRef, key: &str) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("metadata key", key)?;

        let path = format!("{}/metadata/{}", self.machine_path(id), key);
        self.http.del(&path, Some(StatusCode::NO_CONTENT)).await
    }

    /// Delete all metadata from a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete_all_metadata(&self, machine: impl MachineRef) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/metadata", self.machine_path(id));
        self.http.del(&path, Some(StatusCode::NO_CONTENT)).await
    }

    /// Add tags to a machine
    #[instrument(skip(self, machine, tags), level = "debug")]
    pub async fn add_tags(&self, machine: impl MachineRef, tags: Tags) -> Result<Tags> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/tags", self.machine_path(id));
        self.http.post(&path, &[], &tags, None).await
    }

    /// List the tags on a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn tags(&self, machine: impl MachineRef) -> Result<Tags> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/tags", self.machine_path(id));
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get the value of a single tag
    ///
    /// The service responds with the raw tag value rather than JSON.
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn tag(&self, machine: impl MachineRef, name: &str) -> Result<String> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("tag name", name)?;

        let path = format!("{}/tags/{}", self.machine_path(id), name);
        self.http.get_text(&path, GetOptions::default()).await
    }

    /// Delete one tag from a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete_tag(&self, machine: impl MachineRef, name: &str) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("tag name", name)?;

        let path = format!("{}/tags/{}", self.machine_path(id), name);
        self.http.del(&path, Some(StatusCode::NO_CONTENT)).await
    }

    /// Delete all tags from a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete_all_tags(&self, machine: impl MachineRef) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/tags", self.machine_path(id));
        self.http.del(&path, Some(StatusCode::NO_CONTENT)).await
    }

    /// Snapshot the current state of a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn create_snapshot(&self, machine: impl MachineRef, name: &str) -> Result<Snapshot> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("snapshot name", name)?;

        let path = format!("{}/snapshots", self.machine_path(id));

        debug!("Creating snapshot {} of machine {}", name, id);
        self.http
            .post(
                &path,
                &[],
                &CreateSnapshotRequest { name },
                Some(StatusCode::CREATED),
            )
            .await
    }

    /// List the snapshots of a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn snapshots(&self, machine: impl MachineRef) -> Result<Vec<Snapshot>> {
        let id = machine.machine_id();
        require_id("machine id", id)?;

        let path = format!("{}/snapshots", self.machine_path(id));
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get a snapshot of a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn snapshot(&self, machine: impl MachineRef, name: &str) -> Result<Snapshot> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("snapshot name", name)?;

        let path = format!("{}/snapshots/{}", self.machine_path(id), name);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Boot a stopped machine from one of its snapshots
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn start_from_snapshot(
        &self,
        machine: impl MachineRef,
        name: &str,
    ) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("snapshot name", name)?;

        let path = format!("{}/snapshots/{}", self.machine_path(id), name);

        debug!("Starting machine {} from snapshot {}", id, name);
        self.http
            .post(
                &path,
                &[],
                &serde_json::json!({}),
                Some(StatusCode::ACCEPTED),
            )
            .await
    }

    /// Delete a snapshot of a machine
    #[instrument(skip(self, machine), level = "debug")]
    pub async fn delete_snapshot(&self, machine: impl MachineRef, name: &str) -> Result<()> {
        let id = machine.machine_id();
        require_id("machine id", id)?;
        require_id("snapshot name", name)?;

        let path = format!("{}/snapshots/{}", self.machine_path(id), name);
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

    fn service(server: &Server) -> MachinesService {
        let credentials = Credentials::basic("admin", "secret").unwrap();
        let mut http = HttpClient::new("http://localhost", credentials, HttpOptions::default())
            .unwrap();
        http.set_base_url(server.url());
        MachinesService::new(http, "admin".to_string())
    }

    const MACHINE_BODY: &str = r#"{
        "id": "0e07ab09-d725-436a-a374-d11d2ef7c770",
        "name": "web-1",
        "state": "running",
        "type": "smartmachine",
        "memory": 128,
        "ips": ["10.0.0.5"]
    }"#;

    #[tokio::test]
    async fn test_create_machine() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin/machines")
            .match_body(mockito::Matcher::JsonString(
                r#"{"name": "web-1", "package": "regular_128", "tag.role": "web"}"#.to_string(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(MACHINE_BODY)
            .create_async()
            .await;

        let options = CreateMachineOptions::new()
            .with_name("web-1")
            .with_package("regular_128")
            .with_tag("role", "web");
        let machine = service(&server).create(options).await.unwrap();
        assert_eq!(machine.name, "web-1");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_machines_with_filters() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/machines")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("type".into(), "smartmachine".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", MACHINE_BODY))
            .create_async()
            .await;

        let options = ListMachinesOptions::new()
            .with_machine_type("smartmachine")
            .with_limit(10);
        let machines = service(&server).list(options).await.unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].ips, vec!["10.0.0.5"]);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_machines() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("HEAD", "/admin/machines")
            .with_status(200)
            .with_header("x-resource-count", "7")
            .create_async()
            .await;

        let count = service(&server)
            .count(ListMachinesOptions::new())
            .await
            .unwrap();
        assert_eq!(count, 7);

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_stop_machine_dispatches_action() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin/machines/0e07ab09")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "stop".into()))
            .with_status(202)
            .create_async()
            .await;

        service(&server).stop("0e07ab09").await.unwrap();

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_resize_machine_sends_package() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin/machines/0e07ab09")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("action".into(), "resize".into()),
                mockito::Matcher::UrlEncoded("package".into(), "regular_256".into()),
            ]))
            .with_status(202)
            .create_async()
            .await;

        service(&server)
            .resize("0e07ab09", "regular_256")
            .await
            .unwrap();

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_action_rejects_unexpected_success_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/admin/machines/0e07ab09")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let result = service(&server).start("0e07ab09").await;
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }

    #[tokio::test]
    async fn test_get_machine_rejects_empty_id() {
        let server = Server::new_async().await;
        let result = service(&server).get("").await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_machine_tag_returns_raw_value() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/admin/machines/0e07ab09/tags/role")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("web")
            .create_async()
            .await;

        let value = service(&server).tag("0e07ab09", "role").await.unwrap();
        assert_eq!(value, "web");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_snapshot() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/admin/machines/0e07ab09/snapshots")
            .match_body(mockito::Matcher::JsonString(
                r#"{"name": "pre-upgrade"}"#.to_string(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "pre-upgrade", "state": "queued"}"#)
            .create_async()
            .await;

        let snapshot = service(&server)
            .create_snapshot("0e07ab09", "pre-upgrade")
            .await
            .unwrap();
        assert_eq!(snapshot.name, "pre-upgrade");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_machine_purges_cached_entry() {
        let mut server = Server::new_async().await;
        let get_mock = server
            .mock("GET", "/admin/machines/0e07ab09")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(MACHINE_BODY)
            .expect(2)
            .create_async()
            .await;
        let delete_mock = server
            .mock("DELETE", "/admin/machines/0e07ab09")
            .with_status(204)
            .create_async()
            .await;

        let service = service(&server);
        let _ = service.get("0e07ab09").await.unwrap();
        service.delete("0e07ab09").await.unwrap();

        // The delete purged the entry, so this goes back to the network.
        let _ = service.get("0e07ab09").await.unwrap();

        get_mock.assert_async().await;
        delete_mock.assert_async().await;
    }
}
