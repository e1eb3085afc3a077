mod config;

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;

use flowscope_loki::LokiClient;
use flowscope_query::{
    DIRECTION_KEY, END_TIME_KEY, FILTERS_KEY, FlowFetcher, FlowParams, LIMIT_KEY, MATCH_KEY,
    REPORTER_KEY, START_TIME_KEY, TIME_RANGE_KEY,
};

use crate::config::FileConfig;

/// Flowscope - query network flows stored in Loki
#[derive(Parser, Debug)]
#[command(name = "flowscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file with a [loki] table
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Loki base URL (overrides the config file)
    #[arg(long)]
    loki_url: Option<String>,

    /// Tenant sent as X-Scope-OrgID (overrides the config file)
    #[arg(long)]
    tenant_id: Option<String>,

    /// Request timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout: Option<u64>,

    /// Filters, e.g. 'SrcK8S_Namespace=default&Port=80,443|Proto=17'
    #[arg(short, long, default_value = "")]
    filters: String,

    /// How filters combine: all or any
    #[arg(long = "match", default_value = "all")]
    match_mode: String,

    /// Which side reported the flows: source, destination or both
    #[arg(long, default_value = "both")]
    reporter: String,

    /// Start of the range, unix seconds
    #[arg(long)]
    start_time: Option<String>,

    /// End of the range, unix seconds
    #[arg(long)]
    end_time: Option<String>,

    /// Range in seconds back from now, used when --start-time is not set
    #[arg(long)]
    time_range: Option<String>,

    /// Maximum number of entries returned by Loki
    #[arg(long)]
    limit: Option<String>,

    /// Loki sort direction: forward or backward
    #[arg(long)]
    direction: Option<String>,
}

impl Args {
    /// Request parameters, keyed as the flows endpoint expects them
    fn query_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(FILTERS_KEY.to_string(), self.filters.clone());
        params.insert(MATCH_KEY.to_string(), self.match_mode.clone());
        params.insert(REPORTER_KEY.to_string(), self.reporter.clone());
        let optional = [
            (START_TIME_KEY, &self.start_time),
            (END_TIME_KEY, &self.end_time),
            (TIME_RANGE_KEY, &self.time_range),
            (LIMIT_KEY, &self.limit),
            (DIRECTION_KEY, &self.direction),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
        params
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Run the query
    let result = run(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    // Load config file, then apply CLI overrides
    let mut loki = FileConfig::load(args.config.as_deref())?.loki;
    if let Some(url) = &args.loki_url {
        loki.url = url.clone();
    }
    if let Some(tenant) = &args.tenant_id {
        loki.tenant_id = Some(tenant.clone());
    }
    if let Some(timeout) = args.timeout {
        loki.timeout_secs = timeout;
    }
    tracing::debug!(url = %loki.url, labels = ?loki.labels, "Loki configuration");

    // Create Loki client
    let client = LokiClient::new(&loki)?;
    let fetcher = FlowFetcher::new(loki, Arc::new(client));

    // Parse flow parameters
    let params = FlowParams::from_query(&args.query_params(), Utc::now())
        .map_err(|e| anyhow::anyhow!("{} (status {})", e, e.status_code()))?;
    // Fetch and print the merged result
    let body = fetcher
        .fetch(&params)
        .await
        .map_err(|e| anyhow::anyhow!("{} (status {})", e, e.status_code()))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_to_params() {
        let args = Args::parse_from([
            "flowscope",
            "--filters",
            "Port=80",
            "--match",
            "any",
            "--time-range",
            "300",
            "--limit",
            "10",
        ]);
        let params = args.query_params();
        assert_eq!(params.get(FILTERS_KEY).map(String::as_str), Some("Port=80"));
        assert_eq!(params.get(MATCH_KEY).map(String::as_str), Some("any"));
        assert_eq!(params.get(TIME_RANGE_KEY).map(String::as_str), Some("300"));
        assert_eq!(params.get(LIMIT_KEY).map(String::as_str), Some("10"));
        assert!(!params.contains_key(START_TIME_KEY));
    }
}
