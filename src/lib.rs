pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod transport;

pub use client::{OsvClient, Server, VulnerabilityApi};
pub use config::Config;
pub use error::{Error, Result};
pub use model::{
    BatchRequest, BatchResponse, Package, VulnerabilitiesForPackageRequest, Vulnerability,
    VulnerabilitySummary, MAX_BATCH_SIZE,
};
pub use transport::{Transport, TransportConfig};
