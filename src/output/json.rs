use crate::model::{IdList, Vulnerability};
use anyhow::Result;
use serde::Serialize;

pub fn render_vulnerabilities_json(vulns: &[Vulnerability]) -> Result<String> {
    Ok(serde_json::to_string_pretty(vulns)?)
}

/// Same shape as the batch endpoint's response body.
pub fn render_batch_json(results: &[IdList]) -> Result<String> {
    #[derive(Serialize)]
    struct Results<'a> {
        results: &'a [IdList],
    }

    Ok(serde_json::to_string_pretty(&Results { results })?)
}
