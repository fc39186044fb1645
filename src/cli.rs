use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "evidence-checkr",
    about = "Collect vendor/product/version evidence from .dependencyproperties sidecar files",
    version
)]
pub struct Cli {
    /// Directory (or single sidecar file) to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Settings file [default: ./.evidence-checkr/config.toml, fallback ~/.config/evidence-checkr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Allow experimental analyzers (the manual analyzer is one)
    #[arg(long)]
    pub experimental: bool,

    /// Do not run the manual analyzer
    #[arg(long)]
    pub disable_manual: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

impl Cli {
    /// Default log filter for `env_logger` when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
