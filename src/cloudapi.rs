//! CloudAPI client implementation
//!
//! This module provides the client for the public datacenter API: account
//! management, SSH keys, packages, datasets, datacenters, machines, and
//! analytics instrumentation.

mod account;
mod analytics;
mod client;
mod datacenters;
mod datasets;
mod http;
mod keys;
mod machines;
mod packages;
pub mod types;

pub use account::AccountService;
pub use analytics::AnalyticsService;
pub use client::Client;
pub use datacenters::DatacentersService;
pub use datasets::DatasetsService;
pub use keys::KeysService;
pub use machines::MachinesService;
pub use packages::PackagesService;

use crate::error::{Error, Result};

/// Reject empty identifiers before any request is built
pub(crate) fn require_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidRequest(format!("{} must be non-empty", kind)));
    }
    Ok(())
}

/// Re-export of types module for public use
pub mod prelude {
    pub use super::Client;
    pub use super::types::*;
    pub use crate::error::Error;
    pub use crate::error::Result;
}
