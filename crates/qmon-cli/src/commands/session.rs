//! Session cache commands.

use anyhow::{Context, Result};
use console::style;

use qmon_core::CredentialStore;

use super::common::{CredentialArgs, resolve_credentials, session_store};

/// Store the effective credentials in the session cache.
pub fn execute_save(creds: &CredentialArgs) -> Result<()> {
    let store = session_store(creds);
    let cached = store.get().context("Failed to read session cache")?;
    let credentials = resolve_credentials(creds, cached);

    if !credentials.has_api_key() && !credentials.has_instance() {
        anyhow::bail!("Nothing to save. Pass --api-key and --service-crn");
    }
    store.set(&credentials).context("Failed to write session cache")?;

    println!(
        "{} Saved session '{}' to {}",
        style("✓").green().bold(),
        creds.session,
        style(store.path().display()).dim()
    );
    if !credentials.is_complete() {
        println!(
            "{} Credentials are incomplete: both an API key and a service CRN are required",
            style("!").yellow().bold()
        );
    }
    Ok(())
}

/// Delete the session cache.
pub fn execute_clear(creds: &CredentialArgs) -> Result<()> {
    let store = session_store(creds);
    store.clear().context("Failed to clear session cache")?;
    println!("{} Cleared session '{}'", style("✓").green().bold(), creds.session);
    Ok(())
}

/// Show what the session cache holds without revealing the key.
pub fn execute_show(creds: &CredentialArgs) -> Result<()> {
    let store = session_store(creds);
    println!("Session '{}': {}", creds.session, style(store.path().display()).dim());

    let Some(credentials) = store.get().context("Failed to read session cache")? else {
        println!("  {}", style("empty").dim());
        return Ok(());
    };

    let mark = |present: bool| {
        if present {
            style("set").green()
        } else {
            style("missing").red()
        }
    };
    println!("  API key:     {}", mark(credentials.has_api_key()));
    println!(
        "  Service CRN: {}",
        if credentials.has_instance() {
            style(credentials.instance_id.as_str()).green()
        } else {
            style("missing").red()
        }
    );
    println!("  Region:      {}", credentials.region);
    Ok(())
}
