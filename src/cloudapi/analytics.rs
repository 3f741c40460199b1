//! Analytics service for the CloudAPI client
//!
//! Wraps the instrumentation endpoints: describing the available metrics,
//! creating and deleting instrumentations, and fetching their raw values
//! and heatmap renderings.

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::types::{
    CreateInstrumentationOptions, Heatmap, HeatmapOptions, Instrumentation, InstrumentationValue,
};
use crate::error::Result;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Cache time-to-live for the metric catalog, which changes only on
/// service upgrades
const DESCRIBE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Service for analytics instrumentation
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    http: HttpClient,
    account: String,
}

impl AnalyticsService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    fn instrumentation_path(&self, id: u64) -> String {
        format!("/{}/analytics/instrumentations/{}", self.account, id)
    }

    /// Describe the available metrics, fields, and transformations
    #[instrument(skip(self), level = "debug")]
    pub async fn describe(&self) -> Result<Value> {
        let path = format!("/{}/analytics", self.account);
        let opts = GetOptions {
            cache_ttl: Some(DESCRIBE_CACHE_TTL),
            ..GetOptions::default()
        };
        self.http.get(&path, opts).await
    }

    /// Create an instrumentation
    #[instrument(skip(self, options), level = "debug")]
    pub async fn create_instrumentation(
        &self,
        options: CreateInstrumentationOptions,
    ) -> Result<Instrumentation> {
        let path = format!("/{}/analytics/instrumentations", self.account);

        debug!(
            "Instrumenting {}.{} for account {}",
            options.module, options.stat, self.account
        );
        self.http
            .post(&path, &[], &options, Some(StatusCode::CREATED))
            .await
    }

    /// List the active instrumentations
    #[instrument(skip(self), level = "debug")]
    pub async fn list_instrumentations(&self) -> Result<Vec<Instrumentation>> {
        let path = format!("/{}/analytics/instrumentations", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get an instrumentation by id
    #[instrument(skip(self), level = "debug")]
    pub async fn instrumentation(&self, id: u64) -> Result<Instrumentation> {
        self.http
            .get(&self.instrumentation_path(id), GetOptions::default())
            .await
    }

    /// Get the most recent raw value of an instrumentation
    ///
    /// Values are live data and always bypass the cache.
    #[instrument(skip(self), level = "debug")]
    pub async fn value(&self, id: u64) -> Result<InstrumentationValue> {
        let path = format!("{}/value/raw", self.instrumentation_path(id));
        let opts = GetOptions {
            no_cache: true,
            ..GetOptions::default()
        };
        self.http.get(&path, opts).await
    }

    /// Render an instrumentation heatmap image
    #[instrument(skip(self, options), level = "debug")]
    pub async fn heatmap(&self, id: u64, options: HeatmapOptions) -> Result<Heatmap> {
        let path = format!("{}/value/heatmap/image", self.instrumentation_path(id));
        let opts = GetOptions {
            query: options.to_query(),
            no_cache: true,
            ..GetOptions::default()
        };
        self.http.get(&path, opts).await
    }

    /// Look up the values behind a heatmap bucket
    #[instrument(skip(self, options), level = "debug")]
    pub async fn heatmap_details(&self, id: u64, options: HeatmapOptions) -> Result<Value> {
        let path = format!("{}/value/heatmap/details", self.instrumentation_path(id));
        let opts = GetOptions {
            query: options.to_query(),
            no_cache: true,
            ..GetOptions::default()
        };
        self.http.get(&path, opts).await
    }

    /// Delete an instrumentation
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_instrumentation(&self, id: u64) -> Result<()> {
        debug!("Deleting instrumentation {}", id);
        self.http
            .del(
                &self.instrumentation_path(id),
                Some(StatusCode::NO_CONTENT),
            )
            .await
    }
}
