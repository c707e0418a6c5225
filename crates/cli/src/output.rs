//! Output formatting utilities
//!
//! Diagrams may be written to stdout, so status messages go to stderr.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use topology_lib::validate::{CheckOutcome, ValidationReport};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row of the validation table
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "Check")]
    check: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Details")]
    details: String,
}

impl From<&CheckOutcome> for CheckRow {
    fn from(outcome: &CheckOutcome) -> Self {
        let (status, details) = if outcome.passed() {
            ("PASS".green().to_string(), "-".to_string())
        } else {
            let details = outcome
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            ("FAIL".red().bold().to_string(), details)
        };

        Self {
            check: outcome.name.to_string(),
            status,
            details,
        }
    }
}

/// Print a validation report
pub fn print_report(report: &ValidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            let rows: Vec<CheckRow> = report.checks.iter().map(CheckRow::from).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);

            if report.passed() {
                print_success(&format!("All {} checks passed", report.checks.len()));
            } else {
                let failed = report.checks.iter().filter(|c| !c.passed()).count();
                print_error(&format!(
                    "{} failure(s) across {} check(s)",
                    report.failure_count(),
                    failed
                ));
            }
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}
