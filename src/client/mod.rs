//! The OSV API operations and the client implementing them.

mod osv;

pub use osv::OsvClient;

use crate::error::Result;
use crate::model::{BatchRequest, BatchResponse, VulnerabilitiesForPackageRequest, Vulnerability};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Path of the single package query endpoint.
pub const QUERY_PATH: &str = "v1/query";

/// Path of the batch query endpoint.
pub const QUERY_BATCH_PATH: &str = "v1/querybatch";

/// Prefix of the vulnerability-by-ID endpoint; the ID is appended as one
/// path segment.
pub const VULNS_PATH: &str = "v1/vulns/";

/// Remote operations offered by the OSV API.
///
/// Every call is one request/response exchange. Nothing is retried and
/// paginated responses are not followed.
#[async_trait]
pub trait VulnerabilityApi: Send + Sync {
    /// Get the vulnerabilities for the package matched by `request`.
    async fn get_vulnerabilities_for_package(
        &self,
        request: &VulnerabilitiesForPackageRequest,
    ) -> Result<Vec<Vulnerability>>;

    /// Get the IDs of the vulnerabilities for each query of `request`.
    ///
    /// The response holds exactly one entry per query, in query order.
    /// Batches larger than [`MAX_BATCH_SIZE`](crate::model::MAX_BATCH_SIZE)
    /// are rejected without contacting the service.
    async fn get_vulnerability_ids_for_packages(
        &self,
        request: &BatchRequest,
    ) -> Result<BatchResponse>;

    /// Get the vulnerability denoted by `id`.
    async fn get_vulnerability_for_id(&self, id: &str) -> Result<Vulnerability>;
}

/// Well-known OSV API deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Server {
    #[default]
    Production,
    Staging,
}

impl Server {
    pub fn url(&self) -> &'static str {
        match self {
            Server::Production => "https://api.osv.dev",
            Server::Staging => "https://api-staging.osv.dev",
        }
    }
}

impl std::str::FromStr for Server {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Server::Production),
            "staging" => Ok(Server::Staging),
            _ => Err(format!(
                "Unknown server: {}. Use 'production' or 'staging'",
                s
            )),
        }
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Server::Production => write!(f, "production"),
            Server::Staging => write!(f, "staging"),
        }
    }
}
