//! Declarative fixture reader
//!
//! Parses multi-document YAML manifests into the topology model without a
//! cluster. Documents are applied to a single target namespace; a document
//! that cannot be used is logged and skipped so one bad manifest does not
//! hide the rest.

use super::DEFAULT_CLUSTER_NAME;
use crate::builder::NamespaceBuilder;
use crate::error::{Result, TopologyError};
use crate::filter::SystemResourcePolicy;
use crate::model::Cluster;
use crate::observability::TopologyLogger;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENT_SEPARATOR: &str = "---";
const FIXTURE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Builds a one-namespace `Cluster` from fixture documents
#[derive(Debug, Clone)]
pub struct FixtureParser {
    namespace: String,
    policy: SystemResourcePolicy,
}

impl FixtureParser {
    /// Fixtures count every ConfigMap and Secret unless a policy says
    /// otherwise.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            policy: SystemResourcePolicy::CountAll,
        }
    }

    pub fn with_system_policy(mut self, policy: SystemResourcePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Parse every document of every file, in order.
    ///
    /// Namespace, StorageClass and unknown kinds are ignored. Documents with
    /// malformed YAML, a missing kind, or a body that does not decode as the
    /// declared kind are skipped.
    pub fn parse(&self, files: &[Vec<u8>], logger: &TopologyLogger) -> Cluster {
        let mut builder = NamespaceBuilder::new(self.namespace.as_str(), self.policy);

        for (file_index, content) in files.iter().enumerate() {
            let text = match std::str::from_utf8(content) {
                Ok(text) => text,
                Err(e) => {
                    logger.log_document_skipped(file_index, 0, &format!("not valid UTF-8: {}", e));
                    continue;
                }
            };

            for (doc_index, document) in split_documents(text).into_iter().enumerate() {
                if let Err(reason) = apply_document(&mut builder, document) {
                    logger.log_document_skipped(file_index, doc_index, &reason);
                }
            }
        }

        let (config_maps, secrets) = builder.filtered();
        logger.log_system_filtered(&self.namespace, config_maps, secrets);

        let namespace = builder.finish();
        logger.log_namespace_built(&namespace);
        Cluster::new(DEFAULT_CLUSTER_NAME, vec![namespace])
    }
}

/// Read fixture files. Directories expand to their `*.yaml`/`*.yml` entries
/// sorted by file name; plain paths are read as given.
pub fn load_fixture_files(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    let mut contents = Vec::new();

    for path in paths {
        if path.is_dir() {
            for file in fixture_files_in(path)? {
                contents.push(read_fixture(&file)?);
            }
        } else {
            contents.push(read_fixture(path)?);
        }
    }

    Ok(contents)
}

fn fixture_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |source| TopologyError::FixtureRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        let is_fixture = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| FIXTURE_EXTENSIONS.contains(&ext));
        if is_fixture && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

fn read_fixture(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| TopologyError::FixtureRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a YAML stream on `---` separator lines
fn split_documents(text: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim_end() == DOCUMENT_SEPARATOR {
            documents.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&text[start..]);

    documents
}

fn apply_document(builder: &mut NamespaceBuilder, document: &str) -> std::result::Result<(), String> {
    let value: Value =
        serde_yaml::from_str(document).map_err(|e| format!("malformed YAML: {}", e))?;
    if value.is_null() {
        // blank or comment-only document
        return Ok(());
    }

    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing kind".to_string())?
        .to_string();

    let applied = match kind.as_str() {
        "Deployment" => builder.add_deployment(&decode::<Deployment>(value, &kind)?),
        "StatefulSet" => builder.add_stateful_set(&decode::<StatefulSet>(value, &kind)?),
        "DaemonSet" => builder.add_daemon_set(&decode::<DaemonSet>(value, &kind)?),
        "Service" => builder.add_service(&decode::<Service>(value, &kind)?),
        "PersistentVolumeClaim" => builder.add_pvc(&decode::<PersistentVolumeClaim>(value, &kind)?),
        "ConfigMap" => builder.add_config_map(&decode::<ConfigMap>(value, &kind)?).map(drop),
        "Secret" => builder.add_secret(&decode::<Secret>(value, &kind)?).map(drop),
        // Namespace, StorageClass and anything else carry no topology
        _ => Ok(()),
    };

    applied.map_err(|e| e.to_string())
}

fn decode<K: DeserializeOwned>(value: Value, kind: &str) -> std::result::Result<K, String> {
    serde_yaml::from_value(value).map_err(|e| format!("invalid {}: {}", kind, e))
}
