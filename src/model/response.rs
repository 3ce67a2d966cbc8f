use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Vulnerability;

/// Response to a single package query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilitiesForPackageResponse {
    /// The service omits `vulns` when nothing matches.
    #[serde(rename = "vulns", default)]
    pub vulnerabilities: Vec<Vulnerability>,
}

/// Response to a batch query.
///
/// `results[i]` answers `queries[i]` of the request it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<IdList>,
}

impl BatchResponse {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdList> {
        self.results.iter()
    }
}

impl IntoIterator for BatchResponse {
    type Item = IdList;
    type IntoIter = std::vec::IntoIter<IdList>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// The vulnerabilities matching one query of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdList {
    #[serde(rename = "vulns", default)]
    pub vulnerabilities: Vec<VulnerabilitySummary>,
}

impl IdList {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.vulnerabilities.iter().map(|v| v.id.as_str())
    }
}

/// Reduced vulnerability shape returned by the batch endpoint.
///
/// Fetch the full record with
/// [`get_vulnerability_for_id`](crate::client::VulnerabilityApi::get_vulnerability_for_id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VulnerabilitySummary {
    pub id: String,
    pub modified: DateTime<Utc>,
}
