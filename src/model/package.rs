use serde::{Deserialize, Serialize};

/// Identifies a package within an ecosystem.
///
/// The client passes this through untouched; OSV accepts either a
/// `name`/`ecosystem` pair or a package URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
}

impl Package {
    pub fn new(ecosystem: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ecosystem: Some(ecosystem.into()),
            purl: None,
        }
    }

    pub fn from_purl(purl: impl Into<String>) -> Self {
        Self {
            purl: Some(purl.into()),
            ..Self::default()
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.ecosystem, &self.name, &self.purl) {
            (Some(ecosystem), Some(name), _) => write!(f, "{}:{}", ecosystem, name),
            (None, Some(name), _) => write!(f, "{}", name),
            (_, None, Some(purl)) => write!(f, "{}", purl),
            _ => write!(f, "-"),
        }
    }
}
