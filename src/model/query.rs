use serde::{Deserialize, Serialize};

use super::Package;
use crate::error::{Error, Result};

/// Maximum number of queries the service accepts in one batch request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// A lookup of the vulnerabilities affecting one package.
///
/// A query identifies the package either by a source commit hash or by a
/// package coordinate and version, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireQuery", into = "WireQuery")]
pub enum VulnerabilitiesForPackageRequest {
    ByCommit {
        commit: String,
        package: Option<Package>,
    },
    ByVersion {
        package: Package,
        version: String,
    },
}

impl VulnerabilitiesForPackageRequest {
    pub fn by_commit(commit: impl Into<String>, package: Option<Package>) -> Self {
        Self::ByCommit {
            commit: commit.into(),
            package,
        }
    }

    pub fn by_version(package: Package, version: impl Into<String>) -> Self {
        Self::ByVersion {
            package,
            version: version.into(),
        }
    }

    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::ByCommit { commit, .. } => Some(commit),
            Self::ByVersion { .. } => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Self::ByCommit { .. } => None,
            Self::ByVersion { version, .. } => Some(version),
        }
    }

    pub fn package(&self) -> Option<&Package> {
        match self {
            Self::ByCommit { package, .. } => package.as_ref(),
            Self::ByVersion { package, .. } => Some(package),
        }
    }
}

/// Wire layout of a query. `pkg` travels as `package`.
#[derive(Serialize, Deserialize)]
struct WireQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(rename = "package", default, skip_serializing_if = "Option::is_none")]
    pkg: Option<Package>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl TryFrom<WireQuery> for VulnerabilitiesForPackageRequest {
    type Error = &'static str;

    fn try_from(wire: WireQuery) -> std::result::Result<Self, Self::Error> {
        match (wire.commit, wire.pkg, wire.version) {
            (Some(commit), package, None) => Ok(Self::ByCommit { commit, package }),
            (None, Some(package), Some(version)) => Ok(Self::ByVersion { package, version }),
            (Some(_), _, Some(_)) => Err("query sets both `commit` and `version`"),
            (None, None, Some(_)) => Err("query sets `version` without `package`"),
            (None, _, None) => Err("query sets neither `commit` nor `version`"),
        }
    }
}

impl From<VulnerabilitiesForPackageRequest> for WireQuery {
    fn from(query: VulnerabilitiesForPackageRequest) -> Self {
        match query {
            VulnerabilitiesForPackageRequest::ByCommit { commit, package } => Self {
                commit: Some(commit),
                pkg: package,
                version: None,
            },
            VulnerabilitiesForPackageRequest::ByVersion { package, version } => Self {
                commit: None,
                pkg: Some(package),
                version: Some(version),
            },
        }
    }
}

/// Queries sent together to the batch endpoint.
///
/// Holds at most [`MAX_BATCH_SIZE`] queries. Larger inputs have to be split
/// by the caller; nothing here splits or truncates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    queries: Vec<VulnerabilitiesForPackageRequest>,
}

impl BatchRequest {
    /// Wraps `queries` into a batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchTooLarge`] if more than [`MAX_BATCH_SIZE`]
    /// queries are given.
    pub fn new(queries: Vec<VulnerabilitiesForPackageRequest>) -> Result<Self> {
        let batch = Self { queries };
        batch.check_size()?;
        Ok(batch)
    }

    pub fn queries(&self) -> &[VulnerabilitiesForPackageRequest] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn into_queries(self) -> Vec<VulnerabilitiesForPackageRequest> {
        self.queries
    }

    /// A batch can also be produced by deserialization, which skips `new`.
    pub(crate) fn check_size(&self) -> Result<()> {
        if self.queries.len() > MAX_BATCH_SIZE {
            return Err(Error::BatchTooLarge {
                size: self.queries.len(),
                max: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn django() -> Package {
        Package::new("PyPI", "django")
    }

    #[test]
    fn test_by_commit_leaves_version_unset() {
        let commit = "6879efc2c1596d11a6a6ad296f80063b558d5e0f";
        let query = VulnerabilitiesForPackageRequest::by_commit(commit, None);
        assert_eq!(query.commit(), Some(commit));
        assert_eq!(query.version(), None);
        assert_eq!(query.package(), None);

        let query = VulnerabilitiesForPackageRequest::by_commit("abc", Some(django()));
        assert_eq!(query.version(), None);
        assert_eq!(query.package(), Some(&django()));
    }

    #[test]
    fn test_by_version_leaves_commit_unset() {
        let query = VulnerabilitiesForPackageRequest::by_version(django(), "1.4.2");
        assert_eq!(query.commit(), None);
        assert_eq!(query.version(), Some("1.4.2"));
        assert_eq!(query.package(), Some(&django()));
    }

    #[test]
    fn test_query_serializes_pkg_as_package() {
        let query = VulnerabilitiesForPackageRequest::by_version(django(), "1.4.2");
        let value = serde_json::to_value(&query).unwrap();

        assert_eq!(
            value,
            json!({"package": {"name": "django", "ecosystem": "PyPI"}, "version": "1.4.2"})
        );
        assert!(value.get("pkg").is_none());
        assert!(value.get("commit").is_none());
    }

    #[test]
    fn test_commit_query_omits_absent_package() {
        let query = VulnerabilitiesForPackageRequest::by_commit("abc", None);
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({"commit": "abc"}));
    }

    #[test]
    fn test_query_round_trip() {
        let queries = vec![
            VulnerabilitiesForPackageRequest::by_commit("abc", None),
            VulnerabilitiesForPackageRequest::by_commit("def", Some(django())),
            VulnerabilitiesForPackageRequest::by_version(django(), "1.4.2"),
            VulnerabilitiesForPackageRequest::by_version(
                Package::from_purl("pkg:pypi/jinja2"),
                "2.4.1",
            ),
        ];

        for query in queries {
            let json = serde_json::to_string(&query).unwrap();
            let back: VulnerabilitiesForPackageRequest = serde_json::from_str(&json).unwrap();
            assert_eq!(back, query);
        }
    }

    #[test]
    fn test_query_rejects_commit_and_version() {
        let result = serde_json::from_value::<VulnerabilitiesForPackageRequest>(json!({
            "commit": "abc",
            "package": {"name": "django", "ecosystem": "PyPI"},
            "version": "1.4.2"
        }));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("both"), "unexpected error: {}", err);
    }

    #[test]
    fn test_query_rejects_incomplete_shapes() {
        let decode = serde_json::from_value::<VulnerabilitiesForPackageRequest>;
        assert!(decode(json!({"version": "1.0"})).is_err());
        assert!(decode(json!({})).is_err());
        assert!(decode(json!({"package": {"name": "django", "ecosystem": "PyPI"}})).is_err());
    }

    #[test]
    fn test_batch_request_accepts_max_size() {
        let query = VulnerabilitiesForPackageRequest::by_commit("abc", None);
        let queries = vec![query; MAX_BATCH_SIZE];
        let batch = BatchRequest::new(queries).unwrap();
        assert_eq!(batch.len(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_batch_request_rejects_oversized() {
        let query = VulnerabilitiesForPackageRequest::by_commit("abc", None);
        let queries = vec![query; MAX_BATCH_SIZE + 1];
        match BatchRequest::new(queries) {
            Err(Error::BatchTooLarge { size, max }) => {
                assert_eq!(size, 1001);
                assert_eq!(max, 1000);
            }
            other => panic!("expected BatchTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_batch_request_round_trip() {
        let batch = BatchRequest::new(vec![
            VulnerabilitiesForPackageRequest::by_version(django(), "1.4.2"),
            VulnerabilitiesForPackageRequest::by_commit("abc", None),
        ])
        .unwrap();

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["queries"].as_array().unwrap().len(), 2);
        assert_eq!(value["queries"][1], json!({"commit": "abc"}));

        let back: BatchRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);

        let queries = back.into_queries();
        assert_eq!(queries[0].version(), Some("1.4.2"));
        assert_eq!(queries[1].commit(), Some("abc"));
    }

    #[test]
    fn test_deserialized_batch_is_still_checked() {
        let queries = vec![json!({"commit": "abc"}); MAX_BATCH_SIZE + 1];
        let batch: BatchRequest = serde_json::from_value(json!({ "queries": queries })).unwrap();
        assert!(matches!(batch.check_size(), Err(Error::BatchTooLarge { .. })));
    }
}
