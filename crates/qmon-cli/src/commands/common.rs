//! Shared helpers for CLI commands.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, ValueEnum};
use console::{StyledObject, style};

use qmon_core::{
    ALL, CredentialStore, Credentials, FilterCriteria, Job, JobStatus, MemoryCredentialStore,
    MonitorConfig, QueueDepth, SessionFileStore,
};

/// Rows shown per table unless `--all` is given.
pub const PAGE_ROWS: usize = 20;

/// Width of the longest queue-depth bar.
const BAR_WIDTH: usize = 40;

/// Credential flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// IBM Cloud API key
    #[arg(long, global = true, env = "IBM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Service CRN of the Quantum instance
    #[arg(long, global = true, env = "IBM_SERVICE_CRN", alias = "instance")]
    pub service_crn: Option<String>,

    /// Instance region
    #[arg(long, global = true, env = "IBM_REGION")]
    pub region: Option<String>,

    /// Session cache name
    #[arg(long, global = true, default_value = "default")]
    pub session: String,
}

/// Filter flags for job views.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Case-insensitive text matched against ID, backend and program
    #[arg(short, long, default_value = "")]
    pub text: String,

    /// Only jobs on this backend
    #[arg(short, long, default_value = ALL)]
    pub backend: String,

    /// Only jobs of this program
    #[arg(short, long, default_value = ALL)]
    pub program: String,
}

impl ViewArgs {
    /// Filter criteria for the view projector.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::default()
            .with_text(self.text.clone())
            .with_backend(self.backend.clone())
            .with_program(self.program.clone())
    }
}

/// Output format for one-shot commands.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Default configuration path (`~/.config/qmon/config.yaml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("qmon").join("config.yaml"))
}

/// Load configuration from `path`, else the default file when present,
/// else built-in defaults; environment overrides apply last.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let config = match path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => MonitorConfig::load(&path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => MonitorConfig::default(),
        },
    };
    config
        .with_env_overrides()
        .context("Invalid environment override")
}

/// Session cache for the selected session name.
pub fn session_store(args: &CredentialArgs) -> SessionFileStore {
    SessionFileStore::for_session(&args.session)
}

/// Credentials from the session cache with non-empty flags layered on top.
pub fn resolve_credentials(args: &CredentialArgs, cached: Option<Credentials>) -> Credentials {
    let base = cached.unwrap_or_else(|| Credentials::new("", "", ""));
    let pick = |flag: &Option<String>, fallback: String| {
        flag.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map_or(fallback, str::to_string)
    };

    Credentials::new(
        pick(&args.api_key, base.api_key),
        pick(&args.service_crn, base.instance_id),
        pick(&args.region, base.region),
    )
}

/// In-memory store seeded with the effective credentials.
pub fn credential_store(args: &CredentialArgs) -> Result<Arc<dyn CredentialStore>> {
    let cached = session_store(args)
        .get()
        .context("Failed to read session cache")?;
    let credentials = resolve_credentials(args, cached);

    if !credentials.has_api_key() {
        anyhow::bail!("No API key. Pass --api-key, set IBM_API_KEY or run 'qmon session save'");
    }
    if !credentials.has_instance() {
        anyhow::bail!(
            "No service CRN. Pass --service-crn, set IBM_SERVICE_CRN or run 'qmon session save'"
        );
    }
    tracing::debug!("using credentials for region {}", credentials.region);
    Ok(Arc::new(MemoryCredentialStore::with_credentials(credentials)))
}

/// Status colored by outcome.
pub fn styled_status(status: JobStatus) -> StyledObject<&'static str> {
    let name = status.name();
    match status {
        JobStatus::Queued => style(name).yellow(),
        JobStatus::Running => style(name).cyan(),
        JobStatus::Completed => style(name).green(),
        JobStatus::Failed => style(name).red(),
        JobStatus::Cancelled => style(name).dim(),
        JobStatus::Unknown => style(name).magenta(),
    }
}

/// Local-time rendering of a creation timestamp.
pub fn format_created(created_at: Option<DateTime<Utc>>) -> String {
    created_at.map_or_else(
        || "-".to_string(),
        |t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

/// Bar of `width` cells scaled so that `max` fills it.
pub fn queue_bar(count: u64, max: u64, width: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let cells = (count as u128 * width as u128).div_ceil(max as u128) as usize;
    "█".repeat(cells.min(width))
}

/// Print a job table, truncated to [`PAGE_ROWS`] unless `all`.
pub fn print_jobs(title: &str, jobs: &[Job], all: bool) {
    println!(
        "{} {} ({})",
        style("▸").cyan().bold(),
        style(title).bold(),
        jobs.len()
    );
    if jobs.is_empty() {
        println!("    {}", style("no jobs").dim());
        println!();
        return;
    }

    println!(
        "    {:<22} {:<16} {:<10} {:<14} {:<19}",
        style("ID").dim(),
        style("BACKEND").dim(),
        style("STATUS").dim(),
        style("PROGRAM").dim(),
        style("CREATED").dim()
    );
    let shown = if all { jobs.len() } else { jobs.len().min(PAGE_ROWS) };
    for job in &jobs[..shown] {
        println!(
            "    {:<22} {:<16} {:<10} {:<14} {:<19}",
            job.id,
            job.backend,
            styled_status(job.status),
            job.program_id.as_deref().unwrap_or("-"),
            format_created(job.created_at)
        );
        if let Some(reason) = &job.status_reason {
            println!("      {}", style(reason).dim());
        }
    }
    if shown < jobs.len() {
        println!(
            "    {} more (use --all)",
            style(format!("… {}", jobs.len() - shown)).dim()
        );
    }
    println!();
}

/// Print pending job counts per backend.
pub fn print_pending_counts(counts: &BTreeMap<String, usize>) {
    if counts.is_empty() {
        return;
    }
    println!("{} {}", style("▸").cyan().bold(), style("Pending by backend").bold());
    for (backend, count) in counts {
        println!("    {backend:<16} {count}");
    }
    println!();
}

/// Print the queue-depth chart as text bars.
pub fn print_queue_chart(chart: &[QueueDepth]) {
    println!("{} {}", style("▸").cyan().bold(), style("Queue depth").bold());
    let Some(max) = chart.first().map(|d| d.count) else {
        println!("    {}", style("no backend data").dim());
        println!();
        return;
    };
    for depth in chart {
        println!(
            "    {:<16} {:>6} {}",
            depth.name,
            depth.count,
            style(queue_bar(depth.count, max, BAR_WIDTH)).cyan()
        );
    }
    println!();
}
