use serde_json::json;

use crate::cli::config::CliContext;
use crate::cli::utils::{output_data, output_success};
use crate::cli::OutputFormat;
use crate::collections::dashboard_stats;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::from_env()?;
    ctx.gateway
        .ping()
        .await
        .map_err(|e| anyhow::anyhow!("Connection test failed: {}", e))?;

    output_success(
        &output_format,
        &format!("Connected to {}", ctx.config.backend.url),
        Some(json!({ "backend": ctx.config.backend.url.as_str() })),
    )
}

pub async fn stats(output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = CliContext::from_env()?;
    let stats = dashboard_stats(ctx.gateway.as_ref()).await;

    output_data(&output_format, serde_json::to_value(stats)?, || {
        format!(
            "TryHackMe rooms:       {}\nHack The Box machines: {}\nCTF challenges:        {}\nTotal:                 {}",
            stats.tryhackme, stats.hackthebox, stats.ctf, stats.total
        )
    })
}
