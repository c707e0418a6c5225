//! Configuration management for the CLI
//!
//! Settings are layered: built-in defaults, then the config file
//! (`~/.config/k8sdd/config.{json,yaml,toml}` or `--config`), then
//! `K8SDD_*` environment variables. Command-line flags are applied on top
//! by the commands themselves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "K8SDD";

/// CLI settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Namespace containers per grid row (0 for a single column)
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,

    /// List PersistentVolumeClaims
    #[serde(default)]
    pub include_storage: bool,

    /// Kroki server used for `--image`
    #[serde(default = "default_kroki_url")]
    pub kroki_url: String,

    #[serde(default = "default_kroki_timeout")]
    pub kroki_timeout_secs: u64,

    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
}

fn default_grid_columns() -> usize {
    topology_lib::render::DEFAULT_GRID_COLUMNS
}

fn default_kroki_url() -> String {
    "https://kroki.io".to_string()
}

fn default_kroki_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_columns: default_grid_columns(),
            include_storage: false,
            kroki_url: default_kroki_url(),
            kroki_timeout_secs: default_kroki_timeout(),
            kubeconfig: None,
        }
    }
}

impl Settings {
    /// Load settings. An explicit config file must exist; the default one is
    /// optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match config_file {
            Some(path) => {
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = Self::default_config_base() {
                    builder = builder.add_source(
                        config::File::with_name(&path.to_string_lossy()).required(false),
                    );
                }
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// `~/.config/k8sdd/config`, extension resolved by the loader
    fn default_config_base() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("k8sdd").join("config"))
    }
}

/// Resolve the kubeconfig path: flag, then `$KUBECONFIG` (first entry), then
/// settings, then `~/.kube/config`
pub fn kubeconfig_path(override_path: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(path) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
    }

    if let Some(path) = &settings.kubeconfig {
        return Ok(path.clone());
    }

    let home = dirs_next::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".kube").join("config"))
}
