//! Type definitions for the CloudAPI client
//!
//! Wire models for the resources the API exposes, option builders for the
//! requests that take parameters, and the `*Ref` traits that let operations
//! accept either a plain identifier or a previously returned resource.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Default value of the `X-Api-Version` header
const DEFAULT_API_VERSION: &str = "~6.5";

/// Machine metadata: arbitrary JSON values keyed by name
pub type Metadata = HashMap<String, Value>;

/// Machine tags: string values keyed by name
pub type Tags = HashMap<String, String>;

/// Datacenter listing: datacenter name to endpoint URL
pub type Datacenters = HashMap<String, String>;

/// HTTP options for client configuration
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Value sent in the `X-Api-Version` header
    pub api_version: String,

    /// Disable the response cache entirely
    pub no_cache: bool,

    /// Maximum number of cached responses
    pub cache_capacity: usize,

    /// Default time-to-live for cached responses
    pub cache_ttl: Duration,

    /// Whether to automatically retry requests when rate limited
    pub retry_on_rate_limit: bool,

    /// Maximum number of retry attempts for rate-limited requests
    pub max_retries: u32,

    /// Default retry delay in seconds if no Retry-After header is provided
    pub default_retry_after_secs: u64,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            no_cache: false,
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(60),
            retry_on_rate_limit: false,
            max_retries: 3,
            default_retry_after_secs: 2,
        }
    }
}

/// Account details
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account login name
    pub login: String,

    /// Contact email address
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Fields that can be changed on an account
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl UpdateAccountOptions {
    /// Create empty update options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the contact email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the company name
    pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }
}

/// An SSH public key attached to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    /// Key name, used in request paths and signature key ids
    pub name: String,

    /// OpenSSH-format public key
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Machine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    Provisioning,
    Running,
    Stopping,
    Stopped,
    Offline,
    Deleted,
    Failed,
    /// A state this client does not know about
    #[serde(other)]
    Unknown,
}

/// A provisioned machine
#[derive(Debug, Clone, Deserialize)]
pub struct Machine {
    /// Machine identifier (UUID)
    pub id: String,

    /// Machine name
    pub name: String,

    /// Current lifecycle state
    pub state: MachineState,

    #[serde(rename = "type")]
    pub machine_type: Option<String>,

    /// Dataset URN the machine was provisioned from
    pub dataset: Option<String>,

    /// Package name the machine was provisioned with
    pub package: Option<String>,

    /// Memory in MiB
    pub memory: Option<u64>,

    /// Disk in MiB
    pub disk: Option<u64>,

    /// Assigned IP addresses
    #[serde(default)]
    pub ips: Vec<String>,

    /// Machine metadata
    #[serde(default)]
    pub metadata: Metadata,

    pub created: Option<String>,
    pub updated: Option<String>,
}

/// Options for provisioning a machine
///
/// Metadata and tags serialize as the flattened `metadata.<key>` and
/// `tag.<key>` entries the wire format expects.
#[derive(Debug, Clone, Default)]
pub struct CreateMachineOptions {
    /// Machine name
    pub name: Option<String>,

    /// Package to provision with
    pub package: Option<String>,

    /// Dataset to provision from
    pub dataset: Option<String>,

    /// Initial machine metadata
    pub metadata: Metadata,

    /// Initial machine tags
    pub tags: Tags,
}

impl CreateMachineOptions {
    /// Create empty provisioning options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the machine name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the package to provision with
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Set the dataset to provision from
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

impl Serialize for CreateMachineOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(package) = &self.package {
            map.serialize_entry("package", package)?;
        }
        if let Some(dataset) = &self.dataset {
            map.serialize_entry("dataset", dataset)?;
        }
        for (key, value) in &self.metadata {
            map.serialize_entry(&format!("metadata.{}", key), value)?;
        }
        for (key, value) in &self.tags {
            map.serialize_entry(&format!("tag.{}", key), value)?;
        }
        map.end()
    }
}

/// Filter options for listing machines
#[derive(Debug, Clone, Default)]
pub struct ListMachinesOptions {
    /// Filter by machine type
    pub machine_type: Option<String>,

    /// Filter by machine name
    pub name: Option<String>,

    /// Filter by memory size in MiB
    pub memory: Option<u64>,

    /// Maximum number of results
    pub limit: Option<u64>,

    /// Offset into the result set
    pub offset: Option<u64>,

    /// Filter by tags
    pub tags: Tags,
}

impl ListMachinesOptions {
    /// Create empty list options
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by machine type
    pub fn with_machine_type(mut self, machine_type: impl Into<String>) -> Self {
        self.machine_type = Some(machine_type.into());
        self
    }

    /// Filter by machine name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filter by memory size in MiB
    pub fn with_memory(mut self, memory: u64) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Limit the number of results
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip into the result set
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Filter by a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(machine_type) = &self.machine_type {
            query.push(("type".to_string(), machine_type.clone()));
        }
        if let Some(name) = &self.name {
            query.push(("name".to_string(), name.clone()));
        }
        if let Some(memory) = self.memory {
            query.push(("memory".to_string(), memory.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        for (key, value) in &self.tags {
            query.push((format!("tag.{}", key), value.clone()));
        }
        query
    }
}

/// A provisioning package (instance size)
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    /// Package name, used in request paths
    pub name: String,

    /// Memory in MiB
    pub memory: Option<u64>,

    /// Disk in MiB
    pub disk: Option<u64>,

    /// Swap in MiB
    pub swap: Option<u64>,

    pub vcpus: Option<u64>,

    /// Whether this is the account default package
    pub default: Option<bool>,
}

/// A machine image
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    /// Dataset identifier, used in request paths
    pub id: String,

    /// Dataset URN
    pub urn: Option<String>,

    pub name: Option<String>,
    pub version: Option<String>,
    pub os: Option<String>,

    #[serde(rename = "type")]
    pub dataset_type: Option<String>,

    /// Whether this is the account default dataset
    pub default: Option<bool>,

    pub created: Option<String>,
}

/// A machine snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Snapshot name, used in request paths
    pub name: String,

    pub state: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// An analytics instrumentation
#[derive(Debug, Clone, Deserialize)]
pub struct Instrumentation {
    /// Instrumentation identifier, used in request paths
    pub id: u64,

    /// Metric module
    pub module: String,

    /// Metric stat
    pub stat: String,

    #[serde(default)]
    pub predicate: Value,

    #[serde(default)]
    pub decomposition: Vec<String>,

    #[serde(rename = "value-dimension")]
    pub value_dimension: Option<u64>,

    #[serde(rename = "value-arity")]
    pub value_arity: Option<String>,

    pub enabled: Option<bool>,

    #[serde(rename = "retention-time")]
    pub retention_time: Option<u64>,

    pub granularity: Option<u64>,

    pub crtime: Option<u64>,

    pub uri: Option<String>,
}

/// Options for creating an instrumentation
#[derive(Debug, Clone, Serialize)]
pub struct CreateInstrumentationOptions {
    /// Metric module
    pub module: String,

    /// Metric stat
    pub stat: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Value>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decomposition: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<u64>,

    #[serde(
        rename = "retention-time",
        skip_serializing_if = "Option::is_none"
    )]
    pub retention_time: Option<u64>,

    #[serde(rename = "idle-max", skip_serializing_if = "Option::is_none")]
    pub idle_max: Option<u64>,
}

impl CreateInstrumentationOptions {
    /// Create options for the given module and stat
    pub fn new(module: impl Into<String>, stat: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            stat: stat.into(),
            predicate: None,
            decomposition: Vec::new(),
            granularity: None,
            retention_time: None,
            idle_max: None,
        }
    }

    /// Set the predicate
    pub fn with_predicate(mut self, predicate: Value) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Add a decomposition field
    pub fn with_decomposition(mut self, field: impl Into<String>) -> Self {
        self.decomposition.push(field.into());
        self
    }

    /// Set the granularity in seconds
    pub fn with_granularity(mut self, granularity: u64) -> Self {
        self.granularity = Some(granularity);
        self
    }
}

/// A raw instrumentation value
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentationValue {
    /// The reported value; shape depends on the metric's arity
    #[serde(default)]
    pub value: Value,

    #[serde(default)]
    pub transformations: Value,

    #[serde(rename = "start_time")]
    pub start_time: Option<u64>,

    pub duration: Option<u64>,
}

/// A rendered instrumentation heatmap
#[derive(Debug, Clone, Deserialize)]
pub struct Heatmap {
    /// Base64-encoded PNG image
    pub image: Option<String>,

    #[serde(default)]
    pub present: Value,

    pub ymin: Option<u64>,
    pub ymax: Option<u64>,

    #[serde(rename = "bucket_time")]
    pub bucket_time: Option<u64>,

    #[serde(rename = "end_time")]
    pub end_time: Option<u64>,
}

/// Rendering options for instrumentation heatmaps
#[derive(Debug, Clone, Default)]
pub struct HeatmapOptions {
    /// Image width in pixels
    pub width: Option<u64>,

    /// Image height in pixels
    pub height: Option<u64>,

    pub ymin: Option<u64>,
    pub ymax: Option<u64>,

    /// Number of value buckets
    pub nbuckets: Option<u64>,

    /// Decomposition values to highlight
    pub selected: Vec<String>,

    /// Isolate the selected values
    pub isolate: Option<bool>,

    /// Exclude the selected values
    pub exclude: Option<bool>,

    /// X coordinate, for bucket detail lookups
    pub x: Option<u64>,

    /// Y coordinate, for bucket detail lookups
    pub y: Option<u64>,
}

impl HeatmapOptions {
    /// Create empty heatmap options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image dimensions in pixels
    pub fn with_size(mut self, width: u64, height: u64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Highlight a decomposition value
    pub fn with_selected(mut self, value: impl Into<String>) -> Self {
        self.selected.push(value.into());
        self
    }

    /// Set the bucket coordinates for detail lookups
    pub fn with_coordinates(mut self, x: u64, y: u64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(width) = self.width {
            query.push(("width".to_string(), width.to_string()));
        }
        if let Some(height) = self.height {
            query.push(("height".to_string(), height.to_string()));
        }
        if let Some(ymin) = self.ymin {
            query.push(("ymin".to_string(), ymin.to_string()));
        }
        if let Some(ymax) = self.ymax {
            query.push(("ymax".to_string(), ymax.to_string()));
        }
        if let Some(nbuckets) = self.nbuckets {
            query.push(("nbuckets".to_string(), nbuckets.to_string()));
        }
        for value in &self.selected {
            query.push(("selected".to_string(), value.clone()));
        }
        if let Some(isolate) = self.isolate {
            query.push(("isolate".to_string(), isolate.to_string()));
        }
        if let Some(exclude) = self.exclude {
            query.push(("exclude".to_string(), exclude.to_string()));
        }
        if let Some(x) = self.x {
            query.push(("x".to_string(), x.to_string()));
        }
        if let Some(y) = self.y {
            query.push(("y".to_string(), y.to_string()));
        }
        query
    }
}

/// Key argument accepted as either a name or a previously returned
/// [`SshKey`]
pub trait KeyRef {
    /// The key name used in request paths
    fn key_name(&self) -> &str;
}

impl KeyRef for SshKey {
    fn key_name(&self) -> &str {
        &self.name
    }
}

impl KeyRef for str {
    fn key_name(&self) -> &str {
        self
    }
}

impl KeyRef for String {
    fn key_name(&self) -> &str {
        self
    }
}

impl<T: KeyRef + ?Sized> KeyRef for &T {
    fn key_name(&self) -> &str {
        (**self).key_name()
    }
}

/// Machine argument accepted as either an id or a previously returned
/// [`Machine`]
pub trait MachineRef {
    /// The machine id used in request paths
    fn machine_id(&self) -> &str;
}

impl MachineRef for Machine {
    fn machine_id(&self) -> &str {
        &self.id
    }
}

impl MachineRef for str {
    fn machine_id(&self) -> &str {
        self
    }
}

impl MachineRef for String {
    fn machine_id(&self) -> &str {
        self
    }
}

impl<T: MachineRef + ?Sized> MachineRef for &T {
    fn machine_id(&self) -> &str {
        (**self).machine_id()
    }
}

/// Package argument accepted as either a name or a previously returned
/// [`Package`]
pub trait PackageRef {
    /// The package name used in request paths
    fn package_name(&self) -> &str;
}

impl PackageRef for Package {
    fn package_name(&self) -> &str {
        &self.name
    }
}

impl PackageRef for str {
    fn package_name(&self) -> &str {
        self
    }
}

impl PackageRef for String {
    fn package_name(&self) -> &str {
        self
    }
}

impl<T: PackageRef + ?Sized> PackageRef for &T {
    fn package_name(&self) -> &str {
        (**self).package_name()
    }
}

/// Dataset argument accepted as either an id or a previously returned
/// [`Dataset`]
pub trait DatasetRef {
    /// The dataset id used in request paths
    fn dataset_id(&self) -> &str;
}

impl DatasetRef for Dataset {
    fn dataset_id(&self) -> &str {
        &self.id
    }
}

impl DatasetRef for str {
    fn dataset_id(&self) -> &str {
        self
    }
}

impl DatasetRef for String {
    fn dataset_id(&self) -> &str {
        self
    }
}

impl<T: DatasetRef + ?Sized> DatasetRef for &T {
    fn dataset_id(&self) -> &str {
        (**self).dataset_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_machine_options_flatten_metadata_and_tags() {
        let opts = CreateMachineOptions::new()
            .with_name("web-1")
            .with_package("regular_128")
            .with_metadata("user-script", "#!/bin/sh")
            .with_tag("role", "web");

        let value = serde_json::to_value(&opts).unwrap();
        assert_eq!(value["name"], "web-1");
        assert_eq!(value["package"], "regular_128");
        assert_eq!(value["metadata.user-script"], "#!/bin/sh");
        assert_eq!(value["tag.role"], "web");
        assert!(value.get("metadata").is_none());
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn test_list_machines_options_query() {
        let query = ListMachinesOptions::new()
            .with_machine_type("smartmachine")
            .with_limit(10)
            .with_offset(20)
            .with_tag("role", "db")
            .to_query();

        assert!(query.contains(&("type".to_string(), "smartmachine".to_string())));
        assert!(query.contains(&("limit".to_string(), "10".to_string())));
        assert!(query.contains(&("offset".to_string(), "20".to_string())));
        assert!(query.contains(&("tag.role".to_string(), "db".to_string())));
    }

    #[test]
    fn test_heatmap_options_query() {
        let query = HeatmapOptions::new()
            .with_size(800, 200)
            .with_selected("mysql")
            .with_coordinates(10, 20)
            .to_query();

        assert!(query.contains(&("width".to_string(), "800".to_string())));
        assert!(query.contains(&("height".to_string(), "200".to_string())));
        assert!(query.contains(&("selected".to_string(), "mysql".to_string())));
        assert!(query.contains(&("x".to_string(), "10".to_string())));
        assert!(query.contains(&("y".to_string(), "20".to_string())));
    }

    #[test]
    fn test_machine_state_deserializes_unknown_values() {
        let state: MachineState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(state, MachineState::Running);

        let state: MachineState = serde_json::from_str("\"transmogrifying\"").unwrap();
        assert_eq!(state, MachineState::Unknown);
    }

    #[test]
    fn test_machine_ref_accepts_string_or_object() {
        let machine: Machine = serde_json::from_value(serde_json::json!({
            "id": "0e07ab09",
            "name": "web-1",
            "state": "running"
        }))
        .unwrap();

        fn id_of(m: impl MachineRef) -> String {
            m.machine_id().to_string()
        }

        assert_eq!(id_of(&machine), "0e07ab09");
        assert_eq!(id_of("0e07ab09"), "0e07ab09");
        assert_eq!(id_of("0e07ab09".to_string()), "0e07ab09");
    }
}
