//! A blocking facade over [`crate::client::OsvClient`].
//!
//! Each call blocks the calling thread until the response (or failure)
//! arrives. The facade owns a tokio runtime; it must not be used from within
//! an async context.

use tokio::runtime::Runtime;

use crate::client::{self, Server, VulnerabilityApi};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{BatchRequest, BatchResponse, VulnerabilitiesForPackageRequest, Vulnerability};
use crate::transport::Transport;

/// Blocking OSV client. Safe to share between threads.
#[derive(Debug)]
pub struct OsvClient {
    inner: client::OsvClient,
    runtime: Runtime,
}

impl OsvClient {
    pub fn for_server(server: Server, transport: Option<Transport>) -> Result<Self> {
        Self::with_base_url(server.url(), transport)
    }

    pub fn with_base_url(url: &str, transport: Option<Transport>) -> Result<Self> {
        let inner = client::OsvClient::with_base_url(url, transport)?;
        Self::wrap(inner)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::wrap(client::OsvClient::from_config(config)?)
    }

    /// Drives an existing async client from blocking code.
    pub fn wrap(inner: client::OsvClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("osv-client")
            .build()
            .map_err(|err| Error::Runtime(format!("failed to start runtime: {err}")))?;

        Ok(Self { inner, runtime })
    }

    pub fn transport(&self) -> &Transport {
        self.inner.transport()
    }

    pub fn get_vulnerabilities_for_package(
        &self,
        request: &VulnerabilitiesForPackageRequest,
    ) -> Result<Vec<Vulnerability>> {
        self.runtime
            .block_on(self.inner.get_vulnerabilities_for_package(request))
    }

    pub fn get_vulnerability_ids_for_packages(
        &self,
        request: &BatchRequest,
    ) -> Result<BatchResponse> {
        self.runtime
            .block_on(self.inner.get_vulnerability_ids_for_packages(request))
    }

    pub fn get_vulnerability_for_id(&self, id: &str) -> Result<Vulnerability> {
        self.runtime
            .block_on(self.inner.get_vulnerability_for_id(id))
    }
}
