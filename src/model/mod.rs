//! Request and response records exchanged with the OSV API.
//!
//! This module contains the wire types used throughout the client:
//!
//! - [`Package`] - The package coordinate a query refers to
//! - [`VulnerabilitiesForPackageRequest`] - A single query, by commit or by version
//! - [`BatchRequest`] - Up to [`MAX_BATCH_SIZE`] queries sent as one call
//! - [`Vulnerability`] - A full OSV vulnerability record
//! - [`BatchResponse`] - Per-query lists of [`VulnerabilitySummary`]
//!
//! Every field serializes with its snake_case wire name. The few fields whose
//! Rust name differs from the wire key are renamed explicitly next to their
//! declaration (`pkg` is `package`, `vulnerabilities` is `vulns`).
//!
//! # Example
//!
//! ```
//! use osv_client::model::{Package, VulnerabilitiesForPackageRequest};
//!
//! let query = VulnerabilitiesForPackageRequest::by_version(
//!     Package::new("PyPI", "django"),
//!     "1.4.2",
//! );
//!
//! let json = serde_json::to_string(&query).unwrap();
//! assert_eq!(json, r#"{"package":{"name":"django","ecosystem":"PyPI"},"version":"1.4.2"}"#);
//! ```

mod package;
mod query;
mod response;
mod vulnerability;

pub use package::*;
pub use query::*;
pub use response::*;
pub use vulnerability::*;
