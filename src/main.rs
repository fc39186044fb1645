//! `evidence-checkr` — collect hand-written identity evidence for artifacts.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and initialize logging.
//! 2. Load settings ([`config::load_settings`]) and apply CLI overrides.
//! 3. Register analyzers with the [`engine::Engine`] and prepare them.
//! 4. Discover candidate files ([`scanner::collect_dependencies`]).
//! 5. Run the analysis phases, isolating per-artifact failures.
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (clean) or `1` (at least one [`engine::AnalysisFailure`]).

mod analyzer;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod properties;
mod report;
mod scanner;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use analyzer::manual::ManualAnalyzer;
use cli::{Cli, ReportFormat};
use config::{keys, load_settings};
use engine::Engine;
use scanner::collect_dependencies;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let settings_root = if path.is_file() {
        path.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| path.clone())
    } else {
        path.clone()
    };
    let mut settings = load_settings(&settings_root, cli.config.as_deref())?;
    if cli.experimental {
        settings.set_bool(keys::ANALYZER_EXPERIMENTAL_ENABLED, true);
    }
    if cli.disable_manual {
        settings.set_bool(keys::ANALYZER_MANUAL_ENABLED, false);
    }

    let manual = ManualAnalyzer::new(&settings);
    let mut engine = Engine::new(settings);
    engine.register(manual);
    engine.prepare()?;

    if engine.active_analyzers().count() == 0 {
        eprintln!(
            "No analyzer is active. The manual analyzer is experimental: pass --experimental or set {} = true.",
            keys::ANALYZER_EXPERIMENTAL_ENABLED
        );
        std::process::exit(1);
    }

    let mut deps = collect_dependencies(&path, &engine)?;
    info!("Collected {} artifact(s) from {}", deps.len(), path.display());

    if deps.is_empty() && !cli.quiet {
        eprintln!("  {} no .dependencyproperties files found", "→".cyan());
    }

    let pb = if cli.quiet || deps.is_empty() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb
    };

    let failures = engine.run(&mut deps, &pb).await?;
    pb.finish_and_clear();

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&deps, &failures, &path, cli.quiet);
        }
        ReportFormat::Json => {
            println!("{}", report::json::to_string(&deps, &failures)?);
        }
    }

    if !failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
