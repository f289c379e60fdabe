//! Token command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;

use qmon_adapter_ibm::IbmClient;

use super::common::{CredentialArgs, credential_store, load_config};

/// Execute the token command.
pub async fn execute(config: Option<&Path>, creds: &CredentialArgs, show: bool) -> Result<()> {
    let config = load_config(config)?;
    let client = IbmClient::new(&config, credential_store(creds)?)
        .context("Failed to create IBM client")?;

    println!(
        "{} Exchanging API key at {}",
        style("→").cyan().bold(),
        style(&config.iam_token_url).dim()
    );

    let token = client
        .tokens()
        .token()
        .await
        .context("Token exchange failed")?;

    let remaining = token.expires_at() - Utc::now();
    println!(
        "{} Token ready, expires {} ({} min)",
        style("✓").green().bold(),
        token
            .expires_at()
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S"),
        remaining.num_minutes().max(0)
    );
    if show {
        println!("{}", token.value());
    }
    Ok(())
}
