use console::style;
use std::fmt::Write as _;

use super::Config;

/// Render the effective configuration for humans
#[inline]
pub fn show_config(config: &Config) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = render(config, &mut out);
    out
}

fn render(config: &Config, out: &mut String) -> std::fmt::Result {
    writeln!(out, "{}", style("Current Configuration").bold().cyan())?;
    writeln!(out)?;

    writeln!(out, "{}", style("Server:").bold().yellow())?;
    writeln!(
        out,
        "  Name: {} {}",
        style(&config.server.name).cyan(),
        style(&config.server.version).dim()
    )?;
    match config.server.handshake() {
        Some(version) => writeln!(out, "  Handshake: {}", style(version).cyan())?,
        None => writeln!(out, "  Handshake: {}", style("disabled").dim())?,
    }
    let toolsets: Vec<String> = config
        .server
        .toolsets
        .iter()
        .map(ToString::to_string)
        .collect();
    writeln!(out, "  Tool sets: {}", style(toolsets.join(", ")).cyan())?;

    writeln!(out)?;
    writeln!(out, "{}", style("Stores:").bold().yellow())?;
    writeln!(
        out,
        "  Guides: {}",
        style(config.guide.file.display()).cyan()
    )?;
    writeln!(
        out,
        "  Memory: {}",
        style(config.memory.file.display()).cyan()
    )?;

    let vision = &config.vision;
    writeln!(out)?;
    writeln!(out, "{}", style("Vision API:").bold().yellow())?;
    match vision.api_url() {
        Ok(url) => writeln!(out, "  URL: {}", style(url).cyan())?,
        Err(e) => writeln!(out, "  URL: {} ({})", style("Invalid").red(), e)?,
    }
    writeln!(out, "  Flavor: {}", style(format!("{:?}", vision.flavor)).cyan())?;
    writeln!(out, "  Model: {}", style(&vision.model).cyan())?;
    match &vision.api_key {
        Some(key) => writeln!(out, "  API key: {}", style(mask_secret(key)).cyan())?,
        None => writeln!(
            out,
            "  API key: from ${}",
            style(&vision.api_key_env).cyan()
        )?,
    }
    writeln!(out, "  Image input: {}", style(vision.image_input).cyan())?;
    writeln!(out, "  Timeout: {}s", style(vision.timeout_secs).cyan())?;
    writeln!(
        out,
        "  Retry: {} attempt(s), {}ms base delay",
        style(vision.retry.max_attempts).cyan(),
        style(vision.retry.base_delay_ms).cyan()
    )?;

    if let Some(path) = &config.source {
        writeln!(out)?;
        writeln!(out, "Config file: {}", style(path.display()).dim())?;
    }

    Ok(())
}

/// Show only the ends of a secret: `abcd...wxyz`. Short secrets show as `...`
/// so their length is not revealed.
#[inline]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "...".to_string();
    }
    let head: String = chars.iter().take(4).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{}...{}", head, tail)
}
