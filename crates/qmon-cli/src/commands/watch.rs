//! Watch command implementation.
//!
//! Establish a monitor session and redraw the dashboard whenever the
//! snapshot changes, until Ctrl-C.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

use qmon_monitor::{DashboardView, MonitorSession};

use super::common::{
    CredentialArgs, ViewArgs, credential_store, load_config, print_jobs, print_pending_counts,
    print_queue_chart,
};

/// How often the snapshot is checked for changes.
const REDRAW_CHECK: Duration = Duration::from_millis(500);

/// Execute the watch command.
pub async fn execute(
    config: Option<&Path>,
    creds: &CredentialArgs,
    view: &ViewArgs,
    interval_ms: Option<u64>,
) -> Result<()> {
    let config = load_config(config)?;
    let session = MonitorSession::new(&config, credential_store(creds)?)
        .context("Failed to create monitor session")?;
    if let Some(ms) = interval_ms {
        session.set_interval(ms);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Authenticating...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    if let Err(e) = session.establish().await {
        spinner.finish_and_clear();
        return Err(e).context("Failed to establish session");
    }

    let criteria = view.criteria();
    let term = Term::stdout();
    let mut last_seen = None;

    loop {
        let dashboard = session.dashboard(&criteria).await;
        let stamp = (dashboard.jobs_updated_at, dashboard.backends_updated_at);
        if last_seen != Some(stamp) {
            last_seen = Some(stamp);
            spinner.suspend(|| render(&term, &dashboard));
        }
        spinner.set_message(status_line(&dashboard));

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = tokio::time::sleep(REDRAW_CHECK) => {}
        }
    }

    spinner.finish_and_clear();
    session.shutdown();
    println!("{} Stopped polling", style("✓").green().bold());
    Ok(())
}

fn render(term: &Term, dashboard: &DashboardView) {
    if let Err(e) = term.clear_screen() {
        tracing::debug!("clear screen failed: {e}");
    }
    print_jobs("Pending jobs", &dashboard.pending, false);
    print_jobs("Recent jobs", &dashboard.other, false);
    print_pending_counts(&dashboard.pending_by_backend);
    print_queue_chart(&dashboard.queue_chart);
}

fn status_line(dashboard: &DashboardView) -> String {
    let polling = dashboard.polling.map_or_else(
        || "not polling".to_string(),
        |d| format!("polling every {}s", d.as_secs()),
    );
    let updated = dashboard.jobs_updated_at.map_or_else(
        || "no data yet".to_string(),
        |t| {
            format!(
                "updated {}",
                t.with_timezone(&chrono::Local).format("%H:%M:%S")
            )
        },
    );
    let token = if dashboard.token_ready {
        "token ready"
    } else {
        "no token"
    };
    format!("{polling} · {updated} · {token} · Ctrl-C to stop")
}
