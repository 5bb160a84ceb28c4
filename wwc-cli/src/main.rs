//! WWC Copilot CLI: terminal host for the assessment wizard and synthesis panels.

mod assess;
mod commands;
mod notifier;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// WWC Copilot: quality assessment and research synthesis from the terminal
#[derive(Parser, Debug)]
#[command(name = "wwc-copilot", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for .wwc-copilot/config.toml)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file to use instead of the layered lookup
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the synthesis service base URL
    #[arg(long)]
    server: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Walk through the WWC quality-assessment wizard for one paper
    Assess {
        /// Paper identifier in the research library
        paper_id: i64,
        /// Title shown in the wizard header
        #[arg(long)]
        title: Option<String>,
    },
    /// Run synthesis analyses over two or more papers
    Synthesize {
        /// Paper identifiers (at least two distinct)
        #[arg(required = true, num_args = 2..)]
        paper_ids: Vec<i64>,
        /// Analyses to run: meta, conflicts, subgroups, bias, sensitivity (default: all)
        #[arg(short, long = "analysis")]
        analyses: Vec<wwc_core::AnalysisKind>,
        /// Subgroup variable, e.g. age_group or intervention_type
        #[arg(long)]
        subgroup: Option<String>,
        /// Confidence threshold for conflict detection (0 to 1)
        #[arg(long)]
        threshold: Option<f64>,
        /// Outcome name to restrict effect sizes to
        #[arg(long)]
        outcome: Option<String>,
        /// Directory to write forest and funnel plot PNGs into
        #[arg(long)]
        plots: Option<PathBuf>,
        /// Print results as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the stored wizard progress for a paper
    Progress {
        paper_id: i64,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file locations
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "wwc-copilot", "wwc-copilot")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "wwc-copilot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let source = commands::ConfigSource {
        workspace: &workspace,
        file: cli.config.as_deref(),
        server: cli.server.as_deref(),
    };
    commands::handle_command(cli.command, &source).await
}
