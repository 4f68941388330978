use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const EVAL_PREFIX: &str = "eval_";
const EVAL_SUFFIX: &str = ".json";

/// Score line for one evaluated task
#[derive(Debug, Clone, PartialEq)]
pub struct EvalRow {
    pub task: String,
    pub total: String,
    pub result: String,
}

#[derive(Debug, Default)]
pub struct EvalSummary {
    /// Number of `eval_*.json` files found
    pub matched: usize,
    pub rows: Vec<EvalRow>,
    pub skipped: Vec<(PathBuf, String)>,
}

/// Read every `eval_*.json` under `input`, in file name order
#[inline]
pub fn collect(input: &Path) -> Result<EvalSummary> {
    let pattern = format!(
        "{}/{}*{}",
        glob::Pattern::escape(&input.to_string_lossy()),
        EVAL_PREFIX,
        EVAL_SUFFIX
    );
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid search pattern: {}", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Cannot read {}: {}", e.path().display(), e);
                None
            }
        })
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut summary = EvalSummary {
        matched: files.len(),
        ..EvalSummary::default()
    };

    for path in files {
        match read_row(&path) {
            Ok(row) => summary.rows.push(row),
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                summary.skipped.push((path, format!("{:#}", e)));
            }
        }
    }

    Ok(summary)
}

fn read_row(path: &Path) -> Result<EvalRow> {
    let task = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix(EVAL_PREFIX))
        .and_then(|name| name.strip_suffix(EVAL_SUFFIX))
        .filter(|task| !task.is_empty())
        .with_context(|| format!("Unexpected file name: {}", path.display()))?
        .to_string();

    let content = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content)?;
    let score = document.get("final_score");

    Ok(EvalRow {
        task,
        total: score_field(score, "total"),
        result: score_field(score, "result"),
    })
}

fn score_field(score: Option<&Value>, name: &str) -> String {
    match score.and_then(|s| s.get(name)) {
        None | Some(Value::Null) => "0".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render rows as CSV with a `task,total,result` header
#[inline]
pub fn to_csv(rows: &[EvalRow]) -> String {
    let mut csv = String::from("task,total,result\n");
    for row in rows {
        let line = [&row.task, &row.total, &row.result]
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Collect scores from `input` and write them to `output`. Nothing is
/// written when no evaluation files exist.
#[inline]
pub fn summarize(input: &Path, output: &Path) -> Result<EvalSummary> {
    let summary = collect(input)?;
    if summary.matched == 0 {
        info!("No {}*{} files in {}", EVAL_PREFIX, EVAL_SUFFIX, input.display());
        return Ok(summary);
    }

    fs::write(output, to_csv(&summary.rows))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(
        "Wrote {} row(s) to {}",
        summary.rows.len(),
        output.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn summarizes_scores_sorted_by_file_name() {
        let dir = TempDir::new().expect("should create temp dir");
        fs::write(
            dir.path().join("eval_b-task.json"),
            r#"{"final_score": {"total": 4, "result": 1}}"#,
        )
        .expect("should write");
        fs::write(
            dir.path().join("eval_a-task.json"),
            r#"{"final_score": {"total": 2.5}}"#,
        )
        .expect("should write");
        fs::write(dir.path().join("eval_c-task.json"), r#"{"other": 1}"#).expect("should write");
        fs::write(dir.path().join("state_a-task.json"), "{}").expect("should write");

        let output = dir.path().join("summary.csv");
        let summary = summarize(dir.path(), &output).expect("should summarize");

        assert_eq!(summary.matched, 3);
        assert!(summary.skipped.is_empty());
        let csv = fs::read_to_string(&output).expect("should read csv");
        assert_eq!(
            csv,
            "task,total,result\na-task,2.5,0\nb-task,4,1\nc-task,0,0\n"
        );
    }

    #[test]
    fn unparseable_files_are_skipped() {
        let dir = TempDir::new().expect("should create temp dir");
        fs::write(dir.path().join("eval_good.json"), r#"{"final_score": {"total": 1, "result": 1}}"#)
            .expect("should write");
        fs::write(dir.path().join("eval_bad.json"), "{oops").expect("should write");

        let output = dir.path().join("out.csv");
        let summary = summarize(dir.path(), &output).expect("should summarize");

        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(
            fs::read_to_string(&output).expect("should read csv"),
            "task,total,result\ngood,1,1\n"
        );
    }

    #[test]
    fn no_matches_writes_nothing() {
        let dir = TempDir::new().expect("should create temp dir");
        let output = dir.path().join("out.csv");

        let summary = summarize(dir.path(), &output).expect("should summarize");
        assert_eq!(summary.matched, 0);
        assert!(!output.exists());
    }

    #[test]
    fn csv_fields_are_quoted_when_needed() {
        let rows = vec![EvalRow {
            task: "a,\"b\"".to_string(),
            total: "1".to_string(),
            result: "0".to_string(),
        }];
        assert_eq!(to_csv(&rows), "task,total,result\n\"a,\"\"b\"\"\",1,0\n");
    }
}
