use crate::model::{IdList, VulnerabilitiesForPackageRequest, Vulnerability};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Aliases")]
    aliases: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Fixed In")]
    fixed_in: String,
    #[tabled(rename = "Modified")]
    modified: String,
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Query")]
    query: String,
    #[tabled(rename = "Vulns")]
    count: usize,
    #[tabled(rename = "IDs")]
    ids: String,
}

pub fn render_vulnerabilities_table(vulns: &[Vulnerability]) -> String {
    if vulns.is_empty() {
        return "No vulnerabilities found.".to_string();
    }

    let rows: Vec<VulnRow> = vulns
        .iter()
        .map(|v| VulnRow {
            id: v.id.clone(),
            aliases: or_dash(v.aliases.join(", ")),
            summary: truncate(v.summary.as_deref().unwrap_or("-"), 60),
            fixed_in: or_dash(v.fixed_versions().join(", ")),
            modified: v.modified.format("%Y-%m-%d").to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!("Found {} vulnerabilities:\n\n{}", vulns.len(), table)
}

pub fn render_batch_table(
    queries: &[VulnerabilitiesForPackageRequest],
    results: &[IdList],
) -> String {
    let rows: Vec<BatchRow> = queries
        .iter()
        .zip(results)
        .enumerate()
        .map(|(index, (query, result))| BatchRow {
            index,
            query: truncate(&describe_query(query), 50),
            count: result.vulnerabilities.len(),
            ids: or_dash(truncate(&result.ids().collect::<Vec<_>>().join(", "), 60)),
        })
        .collect();

    let affected = results.iter().filter(|r| !r.vulnerabilities.is_empty()).count();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!(
        "{} of {} queries matched vulnerabilities:\n\n{}",
        affected,
        queries.len(),
        table
    )
}

fn describe_query(query: &VulnerabilitiesForPackageRequest) -> String {
    match query {
        VulnerabilitiesForPackageRequest::ByVersion { package, version } => {
            format!("{}@{}", package, version)
        }
        VulnerabilitiesForPackageRequest::ByCommit {
            commit,
            package: Some(package),
        } => format!("{}#{}", package, commit),
        VulnerabilitiesForPackageRequest::ByCommit {
            commit,
            package: None,
        } => format!("#{}", commit),
    }
}

fn or_dash(s: String) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
