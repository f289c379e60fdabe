//! Jobs command implementation.
//!
//! One fetch of both job pages, filtered and printed.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use qmon_adapter_ibm::{IbmClient, JobsFetcher};
use qmon_core::job::DASHBOARD_JOBS_URL;
use qmon_core::view::{filter, pending_counts_by_backend};

use super::common::{
    CredentialArgs, OutputFormat, ViewArgs, credential_store, load_config, print_jobs,
    print_pending_counts,
};

/// Execute the jobs command.
pub async fn execute(
    config: Option<&Path>,
    creds: &CredentialArgs,
    view: &ViewArgs,
    all: bool,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config)?;
    let client = IbmClient::new(&config, credential_store(creds)?)
        .context("Failed to create IBM client")?;
    let fetcher = JobsFetcher::new(Arc::new(client), config.jobs_limit);

    let jobs = fetcher.fetch_jobs().await.context("Failed to fetch jobs")?;
    let criteria = view.criteria();
    let pending = filter(&jobs.pending, &criteria);
    let other = filter(&jobs.other, &criteria);

    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "pending": pending,
                "other": other,
                "pending_by_backend": pending_counts_by_backend(&jobs.pending),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => {
            print_jobs("Pending jobs", &pending, all);
            print_jobs("Recent jobs", &other, all);
            print_pending_counts(&pending_counts_by_backend(&jobs.pending));
            println!("{}", style(format!("Dashboard: {DASHBOARD_JOBS_URL}")).dim());
        }
    }
    Ok(())
}
