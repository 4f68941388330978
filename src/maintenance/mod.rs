//! Offline maintenance for agent run outputs. None of this is reachable
//! through the tool server; each routine backs a CLI subcommand.

pub mod eval_summary;
pub mod organize;
pub mod redact;

pub use eval_summary::{EvalRow, EvalSummary, summarize};
pub use organize::{OrganizeOptions, OrganizeReport, organize};
pub use redact::{RedactMode, RedactReport, redact_dir};
