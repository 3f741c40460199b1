//! Datasets service for the CloudAPI client

use crate::cloudapi::http::{GetOptions, HttpClient};
use crate::cloudapi::require_id;
use crate::cloudapi::types::{Dataset, DatasetRef};
use crate::error::Result;
use tracing::instrument;

/// Service for the machine images visible to an account
#[derive(Debug, Clone)]
pub struct DatasetsService {
    http: HttpClient,
    account: String,
}

impl DatasetsService {
    pub(crate) fn new(http: HttpClient, account: String) -> Self {
        Self { http, account }
    }

    /// List the available datasets
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<Dataset>> {
        let path = format!("/{}/datasets", self.account);
        self.http.get(&path, GetOptions::default()).await
    }

    /// Get a dataset by id or previously returned dataset
    #[instrument(skip(self, dataset), level = "debug")]
    pub async fn get(&self, dataset: impl DatasetRef) -> Result<Dataset> {
        let id = dataset.dataset_id();
        require_id("dataset id", id)?;

        let path = format!("/{}/datasets/{}", self.account, id);
        self.http.get(&path, GetOptions::default()).await
    }
}
