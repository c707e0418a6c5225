//! `k8sdd validate`: check a rendered diagram against fixture manifests

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use topology_lib::validate::{D2Validator, ValidationReport};
use topology_lib::{load_fixture_files, FixtureParser, SystemResourcePolicy, TopologyLogger};

use crate::output::{print_report, OutputFormat};
use crate::ValidateArgs;

/// Validate and print the report. Returns whether every check passed.
pub fn run(args: &ValidateArgs) -> Result<bool> {
    let diagram = read_diagram(args.diagram.as_deref())?;
    let report = validate(args, &diagram)?;

    print_report(&report, args.format)?;
    Ok(report.passed())
}

pub fn validate(args: &ValidateArgs, diagram: &str) -> Result<ValidationReport> {
    let logger = TopologyLogger::new("fixtures");

    let files = load_fixture_files(&args.fixtures).context("Failed to load fixtures")?;
    let policy = if args.exclude_system_resources {
        SystemResourcePolicy::Exclude
    } else {
        SystemResourcePolicy::CountAll
    };
    let expected = FixtureParser::new(args.fixture_namespace.as_str())
        .with_system_policy(policy)
        .parse(&files, &logger);

    let report = D2Validator::new(&expected, diagram).report();
    for check in &report.checks {
        logger.log_check(check.name, check.failures.len());
    }

    Ok(report)
}

/// Read the diagram from a file, or stdin when no file is given
fn read_diagram(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read diagram {}", path.display())),
        None => io::read_to_string(io::stdin()).context("Failed to read diagram from stdin"),
    }
}
