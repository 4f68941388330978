use agent_toolbox::Result;
use agent_toolbox::commands::{configure, eval_summary, organize, redact, serve_mcp};
use agent_toolbox::config::Config;
use agent_toolbox::maintenance::RedactMode;
use agent_toolbox::maintenance::organize::{
    DEFAULT_FORMAT_DIR, DEFAULT_SELECT_DIR, DEFAULT_SUFFIX, OrganizeOptions,
};
use agent_toolbox::toolbox::Toolset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agent-toolbox")]
#[command(about = "Stdio MCP tool server for agents, plus output maintenance utilities")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP tool server on stdio
    Serve {
        /// Tool set to serve; repeat for several. Defaults to the configured list
        #[arg(long = "toolset", value_enum)]
        toolsets: Vec<Toolset>,
    },
    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
    /// Replace a leaked secret in every .json file below a directory
    Redact {
        /// The exact secret to remove
        #[arg(long)]
        secret: String,
        /// Directory to scan recursively
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value = "****")]
        replacement: String,
        #[arg(long, value_enum, default_value_t = RedactMode::Text)]
        mode: RedactMode,
    },
    /// Copy selected task outputs into a select tree and a format tree
    Organize {
        /// Directory holding the run outputs
        #[arg(long)]
        source: PathBuf,
        /// Task list, one task per line
        #[arg(long)]
        tasks: PathBuf,
        #[arg(long, default_value = DEFAULT_SELECT_DIR)]
        select_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_FORMAT_DIR)]
        format_dir: PathBuf,
        /// Appended to each task name to form output file names
        #[arg(long, default_value = DEFAULT_SUFFIX, allow_hyphen_values = true)]
        suffix: String,
    },
    /// Collect final scores from eval_*.json files into a CSV
    EvalSummary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // stdout carries the protocol, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { toolsets } => {
            let config = Config::load(cli.config.as_deref())?;
            serve_mcp(&config, &toolsets)?;
        }
        Commands::Config { show, init } => {
            configure(cli.config.as_deref(), show, init)?;
        }
        Commands::Redact {
            secret,
            path,
            replacement,
            mode,
        } => {
            redact(&path, &secret, &replacement, mode)?;
        }
        Commands::Organize {
            source,
            tasks,
            select_dir,
            format_dir,
            suffix,
        } => {
            let options = OrganizeOptions {
                select_dir,
                format_dir,
                suffix,
                ..OrganizeOptions::new(source, tasks)
            };
            organize(&options)?;
        }
        Commands::EvalSummary { input, output } => {
            eval_summary(&input, &output)?;
        }
    }

    Ok(())
}
