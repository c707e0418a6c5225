//! k8sdd CLI
//!
//! Queries a Kubernetes cluster and generates D2 diagrams of its
//! namespaces, workloads, services, storage and their relationships.

mod commands;
mod config;
mod kroki;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{diagram, validate};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Client crates that log connection chatter at info/debug
const NOISY_TARGETS: &[&str] = &["kube", "hyper", "tower", "rustls"];

/// Generate D2 diagrams from Kubernetes cluster topology
#[derive(Parser)]
#[command(name = "k8sdd")]
#[command(author, version, about = "Generate D2 diagrams from Kubernetes cluster topology")]
#[command(long_about = "k8sdd queries your Kubernetes cluster and generates D2 diagram files \
visualizing namespaces, workloads, services, and their relationships.")]
pub struct Cli {
    #[command(flatten)]
    pub diagram: DiagramArgs,

    /// Config file (default: ~/.config/k8sdd/config.{json,yaml,toml})
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
pub struct DiagramArgs {
    /// Path to kubeconfig (default: $KUBECONFIG or ~/.kube/config)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespace to visualize (default: all non-system)
    #[arg(long, short, global = true)]
    pub namespace: Option<String>,

    /// Include all namespaces (including system)
    #[arg(long, short = 'A', global = true)]
    pub all_namespaces: bool,

    /// Output file (default: stdout)
    #[arg(long, short, global = true, conflicts_with = "image")]
    pub output: Option<PathBuf>,

    /// Render an SVG image through Kroki into this file
    #[arg(long, short, global = true)]
    pub image: Option<PathBuf>,

    /// Include the PVC layer
    #[arg(long, global = true)]
    pub include_storage: bool,

    /// Count system-managed ConfigMaps and Secrets
    #[arg(long, global = true)]
    pub include_system_resources: bool,

    /// Number of columns in the grid layout (0 for a single column)
    #[arg(long, global = true)]
    pub grid_columns: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a D2 diagram from the cluster topology
    Diagram,

    /// Validate a rendered diagram against fixture manifests
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Fixture files or directories (directories expand to *.yaml/*.yml)
    #[arg(long, required = true, num_args = 1..)]
    pub fixtures: Vec<PathBuf>,

    /// Namespace the fixture resources are placed in
    #[arg(long, default_value = "k8s-d2-test")]
    pub fixture_namespace: String,

    /// Rendered diagram (default: stdin)
    #[arg(long)]
    pub diagram: Option<PathBuf>,

    /// Drop system-managed ConfigMaps and Secrets from the expected counts
    #[arg(long)]
    pub exclude_system_resources: bool,

    /// Report format
    #[arg(long, default_value = "table")]
    pub format: output::OutputFormat,
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let directives = NOISY_TARGETS
        .iter()
        .fold(level.to_string(), |acc, target| format!("{},{}=warn", acc, target));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let settings = config::Settings::load(cli.config.as_deref())?;

    match &cli.command {
        None => {
            warn!("Running k8sdd without a subcommand is deprecated");
            output::print_warning(
                "DEPRECATED: use 'k8sdd diagram' instead; running without a subcommand will be removed in v1.0.0",
            );
            let request = diagram::DiagramRequest::new(&cli.diagram, &settings)?;
            diagram::run(&request, cli.quiet).await?;
        }
        Some(Commands::Diagram) => {
            let request = diagram::DiagramRequest::new(&cli.diagram, &settings)?;
            diagram::run(&request, cli.quiet).await?;
        }
        Some(Commands::Validate(args)) => {
            if !validate::run(args)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
