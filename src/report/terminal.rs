use std::path::Path;

use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::engine::AnalysisFailure;
use crate::models::{Confidence, Dependency, EvidenceType};

/// Render a colored terminal report.
pub fn render(deps: &[Dependency], failures: &[AnalysisFailure], path: &Path, quiet: bool) {
    let total = deps.len();
    let identified = deps.iter().filter(|d| is_identified(d)).count();
    let partial = deps
        .iter()
        .filter(|d| !d.evidence().is_empty() && !is_identified(d))
        .count();

    if quiet {
        println!(
            "Total: {}  Identified: {}  Partial: {}  Failed: {}",
            total,
            identified.to_string().green(),
            partial.to_string().yellow(),
            failures.len().to_string().red(),
        );
        return;
    }

    println!(
        "\n {} v{}",
        "evidence-checkr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Scanning: {}\n", path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Artifacts          : {:>4}", total));
    println!(
        " │  {:<48} │",
        format!("{}  Identified      : {:>4}", "✓".green(), identified)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Partial         : {:>4}", "⚠".yellow(), partial)
    );
    println!(
        " │  {:<48} │",
        format!("{}  Failed          : {:>4}", "✗".red(), failures.len())
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if total > 0 {
        println!(" {} Collected evidence:\n", "[EVIDENCE]".cyan().bold());
        render_evidence_table(deps);
        println!();
    }

    if !failures.is_empty() {
        println!(" {} Artifacts that could not be read:\n", "[ERROR]".red().bold());
        render_failure_table(failures);
        println!();
    }
}

/// All three of vendor, product and version are known.
fn is_identified(dep: &Dependency) -> bool {
    EvidenceType::ALL
        .iter()
        .all(|t| dep.best_evidence(*t).is_some())
}

fn render_evidence_table(deps: &[Dependency]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Artifact").add_attribute(Attribute::Bold),
            Cell::new("Ecosystem").add_attribute(Attribute::Bold),
            Cell::new("Vendor").add_attribute(Attribute::Bold),
            Cell::new("Product").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
        ]);

    for dep in deps {
        let mut row = vec![
            Cell::new(&dep.display_file_name),
            Cell::new(dep.ecosystem.as_deref().unwrap_or("-")),
        ];
        for evidence_type in EvidenceType::ALL {
            row.push(match dep.best_evidence(evidence_type) {
                Some(e) => Cell::new(&e.value).fg(confidence_color(e.confidence)),
                None => Cell::new("-").fg(Color::DarkGrey),
            });
        }
        table.add_row(row);
    }

    println!("{}", table);
}

fn render_failure_table(failures: &[AnalysisFailure]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("File").add_attribute(Attribute::Bold),
            Cell::new("Analyzer").add_attribute(Attribute::Bold),
            Cell::new("Error").add_attribute(Attribute::Bold),
        ]);

    for failure in failures {
        table.add_row(vec![
            Cell::new(failure.file.display().to_string()),
            Cell::new(&failure.analyzer),
            Cell::new(&failure.message).fg(Color::Red),
        ]);
    }

    println!("{}", table);
}

fn confidence_color(confidence: Confidence) -> Color {
    match confidence {
        Confidence::Highest => Color::Green,
        Confidence::High => Color::Cyan,
        Confidence::Medium => Color::Yellow,
        Confidence::Low => Color::DarkGrey,
    }
}
