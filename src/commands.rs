use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::info;

use crate::config::display::mask_secret;
use crate::config::{Config, show_config};
use crate::maintenance::{self, OrganizeOptions, RedactMode};
use crate::toolbox::{Toolset, build_server, toolset_names};

/// Run the tool server on stdin/stdout until the input ends
#[inline]
pub fn serve_mcp(config: &Config, toolsets: &[Toolset]) -> Result<()> {
    let toolsets = if toolsets.is_empty() {
        config.server.toolsets.as_slice()
    } else {
        toolsets
    };

    info!(
        "Starting MCP server {} {} on stdio",
        config.server.name, config.server.version
    );

    let mut server = build_server(config, toolsets).context("Failed to start MCP server")?;
    info!(
        "Serving {} tool(s) from: {}",
        server.registry().len(),
        toolset_names(toolsets)
    );

    server.serve_stdio().context("MCP server stopped")?;
    info!("Input closed, shutting down");
    Ok(())
}

/// Print the effective configuration, or write a default file with `init`
#[inline]
pub fn configure(config_path: Option<&Path>, show: bool, init: bool) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    if init {
        let path = config.config_file_path()?;
        if path.exists() {
            println!(
                "Config file already exists: {}",
                style(path.display()).cyan()
            );
        } else {
            let written = config.save()?;
            println!(
                "{} {}",
                style("Wrote default configuration to").green(),
                style(written.display()).cyan()
            );
        }
        if !show {
            return Ok(());
        }
        println!();
    }

    print!("{}", show_config(&config));
    Ok(())
}

#[inline]
pub fn redact(path: &Path, secret: &str, replacement: &str, mode: RedactMode) -> Result<()> {
    println!("Scanning: {}", style(path.display()).cyan());
    println!("Secret: '{}'", mask_secret(secret));
    println!("Replacement: '{}'", replacement);
    println!();

    let report = maintenance::redact_dir(path, secret, replacement, mode)?;

    for file in &report.redacted {
        println!("{} {}", style("[REDACTED]").green(), file.display());
    }
    for file in &report.skipped {
        println!("{} {}", style("[SKIPPED]").yellow(), file.display());
    }
    for (file, reason) in &report.failed {
        println!("{} {}: {}", style("[FAILED]").red(), file.display(), reason);
    }

    println!();
    println!("Scanned {} .json file(s)", report.scanned);
    println!("Redacted: {}", style(report.redacted.len()).green());
    if !report.failed.is_empty() {
        println!("Failed: {}", style(report.failed.len()).red());
    }
    Ok(())
}

#[inline]
pub fn organize(options: &OrganizeOptions) -> Result<()> {
    let report = maintenance::organize(options)?;

    for (task, reason) in &report.failed {
        println!("{} {}: {}", style("[SKIPPED]").yellow(), task, reason);
    }

    println!();
    println!(
        "Copied {} task(s) into {} and {}",
        style(report.copied.len()).green(),
        options.select_dir.display(),
        options.format_dir.display()
    );
    println!("Failed or skipped: {}", report.failed.len());
    Ok(())
}

#[inline]
pub fn eval_summary(input: &Path, output: &Path) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input folder {} does not exist", input.display());
    }

    let summary = maintenance::summarize(input, output)?;
    if summary.matched == 0 {
        println!("No eval_*.json files found in {}", input.display());
        return Ok(());
    }

    for (file, reason) in &summary.skipped {
        println!("{} {}: {}", style("[SKIPPED]").yellow(), file.display(), reason);
    }
    println!(
        "Wrote {} row(s) to {}",
        style(summary.rows.len()).green(),
        style(output.display()).cyan()
    );
    Ok(())
}
