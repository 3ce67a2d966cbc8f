mod json;
mod table;

pub use json::{render_batch_json, render_vulnerabilities_json};
pub use table::{render_batch_table, render_vulnerabilities_table};

use crate::model::{IdList, VulnerabilitiesForPackageRequest, Vulnerability};
use anyhow::Result;

/// Output format for lookup results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_vulnerabilities(vulns: &[Vulnerability], format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Table => render_vulnerabilities_table(vulns),
        OutputFormat::Json => render_vulnerabilities_json(vulns)?,
    };
    println!("{}", text);
    Ok(())
}

/// Prints batch results next to the queries they answer. `results[i]`
/// belongs to `queries[i]`.
pub fn print_batch(
    queries: &[VulnerabilitiesForPackageRequest],
    results: &[IdList],
    format: OutputFormat,
) -> Result<()> {
    let text = match format {
        OutputFormat::Table => render_batch_table(queries, results),
        OutputFormat::Json => render_batch_json(results)?,
    };
    println!("{}", text);
    Ok(())
}
