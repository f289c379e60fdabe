//! Backends command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use qmon_adapter_ibm::{BackendStatusFetcher, IbmClient};
use qmon_core::view::top_backends_by_queue_depth;

use super::common::{CredentialArgs, OutputFormat, credential_store, load_config, print_queue_chart};

/// Execute the backends command.
pub async fn execute(
    config: Option<&Path>,
    creds: &CredentialArgs,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config)?;
    let client = IbmClient::new(&config, credential_store(creds)?)
        .context("Failed to create IBM client")?;
    let fetcher = BackendStatusFetcher::new(
        Arc::new(client),
        config.backend_cap,
        config.backend_concurrency,
    );

    let statuses = fetcher
        .fetch_backend_statuses()
        .await
        .context("Failed to list backends")?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("{} Backends ({}):\n", style("qmon").cyan().bold(), statuses.len());
    for status in &statuses {
        let marker = match status.operational {
            Some(true) => style("●").green(),
            Some(false) => style("○").red(),
            None => style("○").dim(),
        };
        let pending = status
            .pending_jobs
            .map_or_else(|| "unknown".to_string(), |n| format!("{n} pending"));
        println!("  {} {:<20} {}", marker, style(&status.name).bold(), pending);
    }
    println!();

    print_queue_chart(&top_backends_by_queue_depth(&statuses, config.chart_limit));
    Ok(())
}
