//! # strato - Cloud Datacenter API Clients for Rust
//!
//! This crate provides thin, typed async clients for cloud datacenter REST
//! services: the public CloudAPI (accounts, SSH keys, machines, packages,
//! datasets, datacenters, analytics) and the internal Packages API (PAPI).
//!
//! ## Features
//!
//! - HTTP Basic and HTTP Signature (RSA-SHA256) authentication, validated
//!   at client construction
//! - Bounded LRU response cache with per-call time-to-live overrides
//! - Typed request and response models per resource
//! - Service errors normalized into a flat code/message shape
//! - Optional retry with backoff for rate-limited requests
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use strato::cloudapi::Client;
//! use strato::cloudapi::types::ListMachinesOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Sign requests with the account's "laptop" SSH key
//!     let pem = std::fs::read_to_string("/home/admin/.ssh/id_rsa")?;
//!     let client = Client::with_key_auth(
//!         "https://api.example.com",
//!         "admin",
//!         "laptop",
//!         &pem,
//!     )?;
//!
//!     // List running machines
//!     let machines = client
//!         .machines()
//!         .list(ListMachinesOptions::new().with_limit(10))
//!         .await?;
//!
//!     for machine in machines {
//!         println!("{} ({:?})", machine.name, machine.state);
//!     }
//!     Ok(())
//! }
//! ```

mod auth;
mod cache;
mod error;

pub mod cloudapi;
pub mod papi;

pub use error::Error;
pub use error::Result;

/// Re-export of common types for public use
pub mod prelude {
    pub use crate::cloudapi::Client;
    pub use crate::cloudapi::types::*;
    pub use crate::error::Error;
    pub use crate::error::Result;
}
