use anyhow::{Result, bail};
use clap::ValueEnum;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::store::to_pretty_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RedactMode {
    /// Replace every occurrence in the raw file text
    #[default]
    Text,
    /// Replace JSON string values that equal the secret exactly
    JsonValues,
}

#[derive(Debug, Default)]
pub struct RedactReport {
    pub scanned: usize,
    pub redacted: Vec<PathBuf>,
    /// Empty or non-UTF-8 files left untouched
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

enum Outcome {
    Redacted,
    Clean,
    Skipped,
}

/// Scan every `*.json` file below `root` and replace `secret` with
/// `replacement`
#[inline]
pub fn redact_dir(
    root: &Path,
    secret: &str,
    replacement: &str,
    mode: RedactMode,
) -> Result<RedactReport> {
    if secret.is_empty() {
        bail!("Secret to redact cannot be empty");
    }
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    info!("Redacting secrets under {} ({:?} mode)", root.display(), mode);
    let mut report = RedactReport::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                warn!("Cannot read {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        report.scanned += 1;
        let outcome = match mode {
            RedactMode::Text => redact_text(path, secret, replacement),
            RedactMode::JsonValues => redact_json_values(path, secret, replacement),
        };

        match outcome {
            Ok(Outcome::Redacted) => {
                info!("Redacted {}", path.display());
                report.redacted.push(path.to_path_buf());
            }
            Ok(Outcome::Clean) => debug!("No secret in {}", path.display()),
            Ok(Outcome::Skipped) => report.skipped.push(path.to_path_buf()),
            Err(e) => {
                warn!("Failed to process {}: {:#}", path.display(), e);
                report.failed.push((path.to_path_buf(), format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

fn redact_text(path: &Path, secret: &str, replacement: &str) -> Result<Outcome> {
    let bytes = fs::read(path)?;
    let Ok(content) = String::from_utf8(bytes) else {
        warn!("{} is not valid UTF-8, skipping", path.display());
        return Ok(Outcome::Skipped);
    };

    if !content.contains(secret) {
        return Ok(Outcome::Clean);
    }

    fs::write(path, content.replace(secret, replacement))?;
    Ok(Outcome::Redacted)
}

fn redact_json_values(path: &Path, secret: &str, replacement: &str) -> Result<Outcome> {
    let content = fs::read_to_string(path)?;
    if content.is_empty() {
        return Ok(Outcome::Skipped);
    }

    let mut document: Value = serde_json::from_str(&content)?;
    if !replace_values(&mut document, secret, replacement) {
        return Ok(Outcome::Clean);
    }

    fs::write(path, to_pretty_json(&document)?)?;
    Ok(Outcome::Redacted)
}

/// Replace string values equal to `secret` at any depth. Object keys are
/// left alone.
#[inline]
pub fn replace_values(value: &mut Value, secret: &str, replacement: &str) -> bool {
    match value {
        Value::String(s) if s == secret => {
            *s = replacement.to_string();
            true
        }
        Value::Array(items) => items.iter_mut().fold(false, |modified, item| {
            replace_values(item, secret, replacement) | modified
        }),
        Value::Object(map) => map.values_mut().fold(false, |modified, item| {
            replace_values(item, secret, replacement) | modified
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const SECRET: &str = "sk-0123456789abcdef";

    fn fixture() -> TempDir {
        let dir = TempDir::new().expect("should create temp dir");
        let nested = dir.path().join("run-1").join("logs");
        fs::create_dir_all(&nested).expect("should create dirs");

        fs::write(
            dir.path().join("state.json"),
            format!(r#"{{"auth": "Bearer {SECRET}", "key": "{SECRET}"}}"#),
        )
        .expect("should write");
        fs::write(
            nested.join("traj.json"),
            format!(r#"[{{"args": ["{SECRET}", "other"]}}]"#),
        )
        .expect("should write");
        fs::write(dir.path().join("clean.json"), r#"{"ok": true}"#).expect("should write");
        fs::write(dir.path().join("notes.txt"), SECRET).expect("should write");
        dir
    }

    #[test]
    fn text_mode_replaces_every_occurrence() {
        let dir = fixture();
        let report =
            redact_dir(dir.path(), SECRET, "****", RedactMode::Text).expect("should redact");

        assert_eq!(report.scanned, 3);
        assert_eq!(report.redacted.len(), 2);
        assert!(report.failed.is_empty());

        let state = fs::read_to_string(dir.path().join("state.json")).expect("should read");
        assert_eq!(state, r#"{"auth": "Bearer ****", "key": "****"}"#);

        let notes = fs::read_to_string(dir.path().join("notes.txt")).expect("should read");
        assert_eq!(notes, SECRET, "non-json files are not touched");
    }

    #[test]
    fn json_mode_replaces_exact_values_only() {
        let dir = fixture();
        fs::write(dir.path().join("broken.json"), "{not json").expect("should write");
        fs::write(dir.path().join("empty.json"), "").expect("should write");

        let report = redact_dir(dir.path(), SECRET, "[redacted]", RedactMode::JsonValues)
            .expect("should redact");

        assert_eq!(report.scanned, 5);
        assert_eq!(report.redacted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.skipped.len(), 1);

        let state: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("state.json")).expect("should read"),
        )
        .expect("still valid json");
        assert_eq!(
            state,
            json!({"auth": format!("Bearer {SECRET}"), "key": "[redacted]"})
        );
    }

    #[test]
    fn text_mode_skips_non_utf8() {
        let dir = TempDir::new().expect("should create temp dir");
        fs::write(dir.path().join("binary.json"), [0xff, 0xfe, 0x00]).expect("should write");

        let report =
            redact_dir(dir.path(), SECRET, "****", RedactMode::Text).expect("should redact");
        assert_eq!(report.skipped.len(), 1);
        assert!(report.redacted.is_empty());
    }

    #[test]
    fn rejects_empty_secret_and_missing_dir() {
        let dir = TempDir::new().expect("should create temp dir");
        assert!(redact_dir(dir.path(), "", "****", RedactMode::Text).is_err());
        assert!(redact_dir(&dir.path().join("missing"), SECRET, "****", RedactMode::Text).is_err());
    }

    #[test]
    fn replace_values_walks_nested_documents() {
        let mut doc = json!({"a": [{"b": "s"}, "s", "x"], "s": 1});
        assert!(replace_values(&mut doc, "s", "r"));
        assert_eq!(doc, json!({"a": [{"b": "r"}, "r", "x"], "s": 1}));
        assert!(!replace_values(&mut doc, "s", "r"));
    }
}
