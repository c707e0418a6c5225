//! Error types for topology fetching, parsing and rendering

use crate::model::ResourceKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort building or rendering a topology
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to load kubeconfig from {path}: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("failed to create Kubernetes client: {0}")]
    Connection(#[source] kube::Error),

    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] kube::Error),

    #[error("failed to list {kind}s in namespace `{namespace}`: {source}")]
    List {
        kind: ResourceKind,
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("unusable {kind}: {reason}")]
    InvalidResource { kind: ResourceKind, reason: String },

    #[error("failed to read fixture {path}: {source}")]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write diagram: {0}")]
    Render(#[from] std::io::Error),
}

impl TopologyError {
    pub(crate) fn missing_name(kind: ResourceKind) -> Self {
        TopologyError::InvalidResource {
            kind,
            reason: "metadata.name is not set".to_string(),
        }
    }
}

pub type Result<T, E = TopologyError> = std::result::Result<T, E>;
