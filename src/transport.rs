//! Bounded-concurrency HTTP execution.
//!
//! Bulk lookups issue one request per package or per vulnerability ID, often
//! thousands in quick succession. A [`Transport`] lets any number of logical
//! calls be outstanding while capping how many are actually in flight:
//!
//! - globally, across every destination, and
//! - per destination host.
//!
//! Both caps default to [`DEFAULT_MAX_REQUESTS`]. Too small a cap serializes
//! independent lookups; too large a cap floods the service and the local file
//! descriptor budget. Callers tune it by building their own transport.
//!
//! # Example
//!
//! ```
//! use osv_client::transport::{Transport, TransportConfig};
//!
//! let transport = Transport::new(TransportConfig::with_max_requests(16)).unwrap();
//! assert_eq!(transport.config().max_requests_per_host, 16);
//!
//! // Release the pool once all lookups are done.
//! transport.shutdown();
//! ```

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// In-flight request cap, both global and per host.
pub const DEFAULT_MAX_REQUESTS: usize = 100;

/// Default timeout for a whole request/response exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning for a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum simultaneous requests across all hosts.
    pub max_requests: usize,
    /// Maximum simultaneous requests to one host.
    pub max_requests_per_host: usize,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::with_max_requests(DEFAULT_MAX_REQUESTS)
    }
}

impl TransportConfig {
    /// Uses `n` for both the global and the per-host cap.
    pub fn with_max_requests(n: usize) -> Self {
        Self {
            max_requests: n,
            max_requests_per_host: n,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }

    /// Caps of zero are raised to one; caps above what a semaphore can
    /// hold are rejected.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("max_requests", self.max_requests),
            ("max_requests_per_host", self.max_requests_per_host),
        ] {
            if value > Semaphore::MAX_PERMITS {
                return Err(Error::InvalidConfig(format!(
                    "{} is {}, the maximum is {}",
                    name,
                    value,
                    Semaphore::MAX_PERMITS
                )));
            }
        }
        Ok(())
    }
}

pub fn default_user_agent() -> String {
    format!("osv-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Shared HTTP client plus the limiters that bound it.
///
/// Cloning is cheap and every clone shares the same pool and limits.
#[derive(Debug, Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    client: reqwest::Client,
    config: TransportConfig,
    global: Arc<Semaphore>,
    per_host: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Transport {
    /// Builds a transport with its own `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a cap exceeds
    /// [`Semaphore::MAX_PERMITS`], or [`Error::Client`] if the TLS backend
    /// cannot be initialized.
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_requests_per_host.max(1))
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(Error::Client)?;

        Self::from_client(client, config)
    }

    /// Wraps a caller-built `reqwest` client. Its own timeout and user agent
    /// settings win over the ones in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a cap exceeds
    /// [`Semaphore::MAX_PERMITS`].
    pub fn from_client(client: reqwest::Client, config: TransportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                global: Arc::new(Semaphore::new(config.max_requests.max(1))),
                config,
                per_host: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Number of requests currently holding a global slot.
    pub fn in_flight(&self) -> usize {
        self.inner.config.max_requests.max(1) - self.inner.global.available_permits()
    }

    /// Stops accepting requests.
    ///
    /// Calls waiting for a slot and calls made afterwards fail with
    /// [`Error::TransportClosed`]. Requests already in flight run to
    /// completion. Pooled connections are released once the last clone of
    /// this transport is dropped.
    pub fn shutdown(&self) {
        self.inner.global.close();
        for limiter in self.lock_hosts().values() {
            limiter.close();
        }
        info!("transport shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.global.is_closed()
    }

    /// Sends `request` once and decodes a successful JSON body.
    ///
    /// A global slot and a host slot are held until the body has been read.
    pub(crate) async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::Request,
    ) -> Result<T> {
        let method = request.method().clone();
        let url = request.url().to_string();
        let host = host_key(request.url());

        let _permits = self.acquire(&host).await?;

        debug!(%method, %url, "sending request");
        let response = self
            .inner
            .client
            .execute(request)
            .await
            .map_err(|source| Error::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "received response");

        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), "request was not successful");
            let body = response.text().await.map_err(|source| Error::Network {
                url: url.clone(),
                source,
            })?;
            return Err(Error::Status {
                url,
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let body = response.bytes().await.map_err(|source| Error::Network {
            url: url.clone(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| Error::Decode { url, source })
    }

    async fn acquire(&self, host: &str) -> Result<(OwnedSemaphorePermit, OwnedSemaphorePermit)> {
        // Global before host, always in this order.
        let global = self
            .inner
            .global
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::TransportClosed)?;

        let host = self
            .host_limiter(host)
            .acquire_owned()
            .await
            .map_err(|_| Error::TransportClosed)?;

        Ok((global, host))
    }

    fn host_limiter(&self, host: &str) -> Arc<Semaphore> {
        let limit = self.inner.config.max_requests_per_host.max(1);
        self.lock_hosts()
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(limit)))
            .clone()
    }

    fn lock_hosts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Semaphore>>> {
        self.inner
            .per_host
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Error bodies are kept for diagnostics only.
const MAX_ERROR_BODY_CHARS: usize = 4096;

fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body,
    }
}

fn host_key(url: &reqwest::Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}
