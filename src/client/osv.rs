use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Server, VulnerabilityApi, QUERY_BATCH_PATH, QUERY_PATH, VULNS_PATH};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    BatchRequest, BatchResponse, VulnerabilitiesForPackageRequest,
    VulnerabilitiesForPackageResponse, Vulnerability,
};
use crate::transport::{Transport, TransportConfig};

/// REST client for the OSV API.
///
/// The client holds no mutable state of its own; clones share the
/// underlying [`Transport`] and may be used from many tasks at once.
///
/// # Example
///
/// ```no_run
/// use osv_client::client::{OsvClient, Server, VulnerabilityApi};
/// use osv_client::model::{Package, VulnerabilitiesForPackageRequest};
///
/// # async fn run() -> osv_client::Result<()> {
/// let client = OsvClient::for_server(Server::Production, None)?;
/// let django = Package::new("PyPI", "django");
/// let query = VulnerabilitiesForPackageRequest::by_version(django, "1.4.2");
///
/// for vuln in client.get_vulnerabilities_for_package(&query).await? {
///     println!("{}", vuln.id);
/// }
///
/// client.transport().shutdown();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OsvClient {
    base_url: Url,
    transport: Transport,
}

impl OsvClient {
    /// Creates a client for the production server with a default transport.
    pub fn new() -> Result<Self> {
        Self::for_server(Server::Production, None)
    }

    /// Creates a client for `server`, optionally sharing a pre-built
    /// `transport`.
    pub fn for_server(server: Server, transport: Option<Transport>) -> Result<Self> {
        Self::with_base_url(server.url(), transport)
    }

    /// Creates a client for an arbitrary base URL. Endpoint paths are
    /// resolved below the URL's path, so `https://proxy.local/osv` sends
    /// queries to `https://proxy.local/osv/v1/query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not an absolute HTTP(S) URL,
    /// or [`Error::Client`] if the default transport cannot be built.
    pub fn with_base_url(url: &str, transport: Option<Transport>) -> Result<Self> {
        let base_url = parse_base_url(url)?;
        let transport = match transport {
            Some(transport) => transport,
            None => Transport::new(TransportConfig::default())?,
        };

        debug!(base_url = %base_url, "created OSV client");
        Ok(Self {
            base_url,
            transport,
        })
    }

    /// Creates a client for the endpoint and transport tuning in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Transport::new(config.transport_config())?;
        Self::with_base_url(&config.base_url(), Some(transport))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The transport this client sends through. Whoever built it is
    /// responsible for [`Transport::shutdown`].
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|err| Error::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            reason: err.to_string(),
        })
    }

    fn vulnerability_url(&self, id: &str) -> Result<Url> {
        // Empty and dot segments would resolve outside `v1/vulns/{id}`.
        if matches!(id, "" | "." | "..") {
            return Err(Error::InvalidUrl {
                url: format!("{}{}{}", self.base_url, VULNS_PATH, id),
                reason: format!("`{}` is not a vulnerability ID", id),
            });
        }

        let mut url = self.endpoint(VULNS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn post<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let request = self
            .transport
            .client()
            .post(url.clone())
            .json(body)
            .build()
            .map_err(|source| Error::Network {
                url: url.to_string(),
                source,
            })?;
        self.transport.execute(request).await
    }
}

#[async_trait]
impl VulnerabilityApi for OsvClient {
    async fn get_vulnerabilities_for_package(
        &self,
        request: &VulnerabilitiesForPackageRequest,
    ) -> Result<Vec<Vulnerability>> {
        let url = self.endpoint(QUERY_PATH)?;
        let response: VulnerabilitiesForPackageResponse = self.post(url, request).await?;
        Ok(response.vulnerabilities)
    }

    async fn get_vulnerability_ids_for_packages(
        &self,
        request: &BatchRequest,
    ) -> Result<BatchResponse> {
        request.check_size()?;

        let url = self.endpoint(QUERY_BATCH_PATH)?;
        debug!(queries = request.len(), "sending batch query");
        let response: BatchResponse = self.post(url, request).await?;

        if response.len() != request.len() {
            warn!(
                expected = request.len(),
                actual = response.len(),
                "batch response does not match query count"
            );
            return Err(Error::ResultCountMismatch {
                expected: request.len(),
                actual: response.len(),
            });
        }

        Ok(response)
    }

    async fn get_vulnerability_for_id(&self, id: &str) -> Result<Vulnerability> {
        let url = self.vulnerability_url(id)?;
        let request = self
            .transport
            .client()
            .get(url.clone())
            .build()
            .map_err(|source| Error::Network {
                url: url.to_string(),
                source,
            })?;
        self.transport.execute(request).await
    }
}

fn parse_base_url(url: &str) -> Result<Url> {
    let invalid = |reason: &str| Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let mut parsed = Url::parse(url).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base"));
    }

    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Ok(parsed)
}
