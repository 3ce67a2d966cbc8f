use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::{join_all, try_join_all};
use indicatif::{ProgressBar, ProgressStyle};
use osv_client::{
    config::Config,
    model::{BatchRequest, IdList, Package, VulnerabilitiesForPackageRequest, MAX_BATCH_SIZE},
    output::{print_batch, print_vulnerabilities, OutputFormat},
    OsvClient, Server, VulnerabilityApi,
};
use serde::Deserialize;
use std::io::Read;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Exit codes for scripting
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "osv")]
#[command(
    author,
    version,
    about = "Look up known vulnerabilities in the OSV database"
)]
struct Cli {
    /// Use the staging server instead of production
    #[arg(long, global = true)]
    staging: bool,

    /// Base URL of the API, overrides the configured server
    #[arg(long, global = true)]
    url: Option<String>,

    /// Maximum simultaneous requests, globally and per host
    #[arg(long, global = true)]
    max_requests: Option<usize>,

    /// Output format (table, json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Log requests to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the vulnerabilities of one package version or commit
    Query {
        /// Package ecosystem, e.g. PyPI, npm, crates.io
        #[arg(long)]
        ecosystem: Option<String>,

        /// Package name
        #[arg(long)]
        name: Option<String>,

        /// Package URL, instead of ecosystem and name
        #[arg(long, conflicts_with_all = ["ecosystem", "name"])]
        purl: Option<String>,

        /// Package version
        #[arg(long = "version", conflicts_with = "commit")]
        pkg_version: Option<String>,

        /// Source commit hash
        #[arg(long)]
        commit: Option<String>,
    },

    /// Look up vulnerability IDs for many queries read from a JSON file
    Batch {
        /// File holding a JSON array of queries, or `-` for stdin
        file: String,
    },

    /// Fetch full vulnerability records by ID
    Vuln {
        /// Vulnerability IDs, e.g. GHSA-7xr5-9hcq-chf9
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().unwrap_or_default();
    if cli.staging {
        config.server = Server::Staging;
        config.url = None;
    }
    if let Some(url) = cli.url {
        config.url = Some(url);
    }
    if let Some(n) = cli.max_requests {
        config.max_requests = n;
        config.max_requests_per_host = n;
    }

    let format = match cli.format {
        Some(format) => OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?,
        None => OutputFormat::Table,
    };

    if let Commands::Config { init, path } = cli.command {
        handle_config(init, path)?;
        return Ok(exit_codes::SUCCESS);
    }

    let client = OsvClient::from_config(&config)?;
    debug!(base_url = %client.base_url(), "using OSV server");

    run_and_shutdown(&client, cli.command, format).await
}

/// Runs `command`, then shuts the transport down whether or not it failed.
async fn run_and_shutdown(
    client: &OsvClient,
    command: Commands,
    format: OutputFormat,
) -> Result<u8> {
    let result = run_command(client, command, format).await;
    client.transport().shutdown();
    result
}

async fn run_command(client: &OsvClient, command: Commands, format: OutputFormat) -> Result<u8> {
    match command {
        Commands::Query {
            ecosystem,
            name,
            purl,
            pkg_version,
            commit,
        } => {
            let query = build_query(ecosystem, name, purl, pkg_version, commit)?;
            run_query(client, &query, format).await
        }
        Commands::Batch { file } => run_batch(client, &file, format).await,
        Commands::Vuln { ids } => run_vuln(client, &ids, format).await,
        Commands::Config { .. } => Ok(exit_codes::SUCCESS),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_query(
    ecosystem: Option<String>,
    name: Option<String>,
    purl: Option<String>,
    version: Option<String>,
    commit: Option<String>,
) -> Result<VulnerabilitiesForPackageRequest> {
    let package = match (ecosystem, name, purl) {
        (None, None, Some(purl)) => Some(Package::from_purl(purl)),
        (Some(ecosystem), Some(name), None) => Some(Package::new(ecosystem, name)),
        (None, None, None) => None,
        _ => bail!("--ecosystem and --name must be given together"),
    };

    match (commit, version, package) {
        (Some(commit), None, package) => Ok(VulnerabilitiesForPackageRequest::by_commit(
            commit, package,
        )),
        (None, Some(version), Some(package)) => Ok(VulnerabilitiesForPackageRequest::by_version(
            package, version,
        )),
        (None, Some(_), None) => {
            bail!("--version requires a package (--ecosystem and --name, or --purl)")
        }
        (None, None, _) => bail!("either --commit or --version is required"),
        (Some(_), Some(_), _) => bail!("--commit and --version cannot be combined"),
    }
}

async fn run_query(
    client: &OsvClient,
    query: &VulnerabilitiesForPackageRequest,
    format: OutputFormat,
) -> Result<u8> {
    let vulns = client.get_vulnerabilities_for_package(query).await?;
    print_vulnerabilities(&vulns, format)?;
    Ok(exit_codes::SUCCESS)
}

/// Either a bare array of queries or a batch request body.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Queries(Vec<VulnerabilitiesForPackageRequest>),
    Request(BatchRequest),
}

impl BatchInput {
    fn into_queries(self) -> Vec<VulnerabilitiesForPackageRequest> {
        match self {
            BatchInput::Queries(queries) => queries,
            BatchInput::Request(request) => request.into_queries(),
        }
    }
}

fn read_queries(file: &str) -> Result<Vec<VulnerabilitiesForPackageRequest>> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file))?
    };

    let input: BatchInput =
        serde_json::from_str(&content).with_context(|| format!("invalid queries in {}", file))?;
    Ok(input.into_queries())
}

async fn run_batch(client: &OsvClient, file: &str, format: OutputFormat) -> Result<u8> {
    let queries = read_queries(file)?;

    // The service takes at most MAX_BATCH_SIZE queries per call; the chunks
    // go out concurrently and come back in input order.
    let batches = queries
        .chunks(MAX_BATCH_SIZE)
        .map(|chunk| BatchRequest::new(chunk.to_vec()))
        .collect::<osv_client::Result<Vec<_>>>()?;
    debug!(queries = queries.len(), batches = batches.len(), "sending batch queries");

    let responses = try_join_all(
        batches
            .iter()
            .map(|batch| client.get_vulnerability_ids_for_packages(batch)),
    )
    .await?;

    let results: Vec<IdList> = responses.into_iter().flatten().collect();
    print_batch(&queries, &results, format)?;
    Ok(exit_codes::SUCCESS)
}

async fn run_vuln(client: &OsvClient, ids: &[String], format: OutputFormat) -> Result<u8> {
    let progress = if format == OutputFormat::Table && ids.len() > 1 {
        let pb = ProgressBar::new(ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} Fetching vulnerabilities...",
                )?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    // One request per ID; the transport bounds how many run at once.
    let results = join_all(ids.iter().map(|id| {
        let pb = progress.clone();
        async move {
            let result = client.get_vulnerability_for_id(id).await;
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
            (id, result)
        }
    }))
    .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let mut vulns = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (id, result) in results {
        match result {
            Ok(vuln) => vulns.push(vuln),
            Err(e) => {
                error!(%id, "lookup failed: {}", e);
                failed += 1;
            }
        }
    }

    print_vulnerabilities(&vulns, format)?;

    if failed > 0 {
        eprintln!("{} of {} lookups failed", failed, ids.len());
        Ok(exit_codes::ERROR)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'osv config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
