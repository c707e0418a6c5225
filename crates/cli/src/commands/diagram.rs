//! `k8sdd diagram`: fetch the live topology and render it

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use topology_lib::{
    fetch_topology, render_to_string, ClusterReader, FetchOptions, KubeReader, RenderOptions,
    TopologyLogger,
};
use tracing::info;

use crate::config::{kubeconfig_path, Settings};
use crate::kroki::{svg_output_path, KrokiClient};
use crate::output::print_success;
use crate::DiagramArgs;

/// Where the rendered diagram goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    /// SVG via Kroki, always with a `.svg` extension
    Image(PathBuf),
}

/// Fully resolved diagram invocation
#[derive(Debug, Clone)]
pub struct DiagramRequest {
    pub kubeconfig: PathBuf,
    pub fetch: FetchOptions,
    pub render: RenderOptions,
    pub destination: Destination,
    pub kroki_url: String,
    pub kroki_timeout: Duration,
}

impl DiagramRequest {
    /// Apply flags on top of the loaded settings
    pub fn new(args: &DiagramArgs, settings: &Settings) -> Result<Self> {
        let destination = match (&args.output, &args.image) {
            (Some(_), Some(_)) => {
                anyhow::bail!("flags --output/-o and --image/-i are mutually exclusive")
            }
            (Some(path), None) => Destination::File(path.clone()),
            (None, Some(path)) => Destination::Image(svg_output_path(path)),
            (None, None) => Destination::Stdout,
        };

        Ok(Self {
            kubeconfig: kubeconfig_path(args.kubeconfig.as_deref(), settings)?,
            fetch: FetchOptions {
                namespace: args.namespace.clone(),
                all_namespaces: args.all_namespaces,
                include_storage: args.include_storage || settings.include_storage,
                include_system_resources: args.include_system_resources,
            },
            render: RenderOptions {
                grid_columns: args.grid_columns.unwrap_or(settings.grid_columns),
            },
            destination,
            kroki_url: settings.kroki_url.clone(),
            kroki_timeout: Duration::from_secs(settings.kroki_timeout_secs),
        })
    }
}

/// Fetch, render and write. The destination is only touched once the
/// diagram (or image) is complete.
pub async fn run(request: &DiagramRequest, quiet: bool) -> Result<()> {
    let reader = KubeReader::connect(&request.kubeconfig)
        .await
        .context("Failed to create Kubernetes client")?;
    let logger = TopologyLogger::new(reader.cluster_name());

    let cluster = fetch_topology(&reader, &request.fetch, &logger)
        .await
        .context("Failed to fetch cluster topology")?;

    let diagram = render_to_string(&cluster, &request.render);
    logger.log_rendered(cluster.namespaces.len(), diagram.len());

    match &request.destination {
        Destination::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(diagram.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write diagram to stdout")?;
        }
        Destination::File(path) => {
            fs::write(path, &diagram)
                .with_context(|| format!("Failed to write diagram to {}", path.display()))?;
            if !quiet {
                print_success(&format!("D2 diagram written to {}", path.display()));
            }
        }
        Destination::Image(path) => {
            let kroki = KrokiClient::new(&request.kroki_url, request.kroki_timeout)?;
            let svg = kroki.generate_svg(&diagram).await?;
            fs::write(path, svg)
                .with_context(|| format!("Failed to write image to {}", path.display()))?;
            info!(file = %path.display(), "SVG image generated");
            if !quiet {
                print_success(&format!("SVG image written to {}", path.display()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args() -> DiagramArgs {
        DiagramArgs {
            kubeconfig: Some(PathBuf::from("/tmp/kubeconfig")),
            namespace: None,
            all_namespaces: false,
            output: None,
            image: None,
            include_storage: false,
            include_system_resources: false,
            grid_columns: None,
        }
    }

    #[test]
    fn test_settings_fill_unset_flags() {
        let settings = Settings {
            grid_columns: 4,
            include_storage: true,
            ..Default::default()
        };

        let request = DiagramRequest::new(&args(), &settings).unwrap();

        assert_eq!(request.render.grid_columns, 4);
        assert!(request.fetch.include_storage);
        assert_eq!(request.destination, Destination::Stdout);
        assert_eq!(request.kubeconfig, Path::new("/tmp/kubeconfig"));
        assert_eq!(request.kroki_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override_settings() {
        let mut args = args();
        args.grid_columns = Some(0);
        args.namespace = Some("shop".to_string());
        args.image = Some(PathBuf::from("topology.png"));

        let request = DiagramRequest::new(&args, &Settings::default()).unwrap();

        assert_eq!(request.render.grid_columns, 0);
        assert_eq!(request.fetch.namespace.as_deref(), Some("shop"));
        assert_eq!(request.destination, Destination::Image(PathBuf::from("topology.svg")));
    }

    #[test]
    fn test_output_and_image_are_exclusive() {
        let mut args = args();
        args.output = Some(PathBuf::from("out.d2"));
        args.image = Some(PathBuf::from("out.svg"));

        assert!(DiagramRequest::new(&args, &Settings::default()).is_err());
    }
}
