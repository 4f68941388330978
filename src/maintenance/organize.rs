use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_SUFFIX: &str = "-image";
pub const DEFAULT_SELECT_DIR: &str = "select-outputs";
pub const DEFAULT_FORMAT_DIR: &str = "format-outputs";

const SCREENSHOTS: &str = "screenshots";
const RESULTS: &str = "results";
const STATES: &str = "states";
const TRAJECTORIES: &str = "trajectories";

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub source: PathBuf,
    pub tasks_file: PathBuf,
    /// Copy of the selected outputs in their original layout
    pub select_dir: PathBuf,
    /// Copy of the selected outputs grouped by kind
    pub format_dir: PathBuf,
    pub suffix: String,
}

impl OrganizeOptions {
    #[inline]
    pub fn new(source: impl Into<PathBuf>, tasks_file: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            tasks_file: tasks_file.into(),
            select_dir: PathBuf::from(DEFAULT_SELECT_DIR),
            format_dir: PathBuf::from(DEFAULT_FORMAT_DIR),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct OrganizeReport {
    pub copied: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Output files of one task run
struct TaskOutputs {
    name: String,
    screenshots: PathBuf,
    eval: PathBuf,
    state: PathBuf,
    trajectory: PathBuf,
}

impl TaskOutputs {
    fn locate(source: &Path, name: String) -> Self {
        Self {
            screenshots: source.join(SCREENSHOTS).join(&name),
            eval: source.join(format!("eval_{}.json", name)),
            state: source.join(format!("state_{}.json", name)),
            trajectory: source.join(format!("traj_{}.json", name)),
            name,
        }
    }

    fn first_missing(&self) -> Option<&Path> {
        [&self.screenshots, &self.eval, &self.state, &self.trajectory]
            .into_iter()
            .find(|path| !path.exists())
            .map(PathBuf::as_path)
    }
}

/// Task names from a list file: one per line, surrounding whitespace and
/// blank lines ignored
#[inline]
pub fn read_tasks(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read task list: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Copy the outputs of each listed task into the select and format trees
#[inline]
pub fn organize(options: &OrganizeOptions) -> Result<OrganizeReport> {
    if !options.source.is_dir() {
        bail!("Source directory {} does not exist", options.source.display());
    }
    let tasks = read_tasks(&options.tasks_file)?;
    info!(
        "Organizing {} task(s) from {}",
        tasks.len(),
        options.source.display()
    );

    let layout = Layout::prepare(&options.select_dir, &options.format_dir)?;

    let mut report = OrganizeReport::default();

    for task in tasks {
        let outputs = TaskOutputs::locate(&options.source, format!("{}{}", task, options.suffix));

        if let Some(missing) = outputs.first_missing() {
            warn!("Skipping task {}: {} does not exist", task, missing.display());
            report
                .failed
                .push((task, format!("missing {}", missing.display())));
            continue;
        }

        match layout.copy(&outputs) {
            Ok(()) => {
                info!("Copied outputs for task {}", task);
                report.copied.push(task);
            }
            Err(e) => {
                warn!("Failed to copy outputs for task {}: {:#}", task, e);
                report.failed.push((task, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

/// Destination directories, created up front
struct Layout<'a> {
    select_dir: &'a Path,
    select_screenshots: PathBuf,
    format_screenshots: PathBuf,
    format_results: PathBuf,
    format_states: PathBuf,
    format_trajectories: PathBuf,
}

impl<'a> Layout<'a> {
    fn prepare(select_dir: &'a Path, format_dir: &Path) -> Result<Self> {
        let layout = Self {
            select_dir,
            select_screenshots: select_dir.join(SCREENSHOTS),
            format_screenshots: format_dir.join(SCREENSHOTS),
            format_results: format_dir.join(RESULTS),
            format_states: format_dir.join(STATES),
            format_trajectories: format_dir.join(TRAJECTORIES),
        };

        for dir in [
            &layout.select_screenshots,
            &layout.format_screenshots,
            &layout.format_results,
            &layout.format_states,
            &layout.format_trajectories,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(layout)
    }

    fn copy(&self, outputs: &TaskOutputs) -> Result<()> {
        copy_tree(
            &outputs.screenshots,
            &self.select_screenshots.join(&outputs.name),
        )?;
        copy_into(&outputs.eval, self.select_dir)?;
        copy_into(&outputs.state, self.select_dir)?;
        copy_into(&outputs.trajectory, self.select_dir)?;

        copy_tree(
            &outputs.screenshots,
            &self.format_screenshots.join(&outputs.name),
        )?;
        copy_into(&outputs.eval, &self.format_results)?;
        copy_into(&outputs.state, &self.format_states)?;
        copy_into(&outputs.trajectory, &self.format_trajectories)?;
        Ok(())
    }
}

fn copy_into(file: &Path, dir: &Path) -> Result<()> {
    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    let target = dir.join(name);
    fs::copy(file, &target)
        .with_context(|| format!("Failed to copy {} to {}", file.display(), target.display()))?;
    Ok(())
}

/// Recursive copy that merges into an existing destination
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}
