//! Live cluster reader backed by `kube::Client`

use super::{ClusterReader, DEFAULT_CLUSTER_NAME};
use crate::error::{Result, TopologyError};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolumeClaim, Secret, Service,
};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;
use tracing::debug;

/// Reads resources through the Kubernetes API using a kubeconfig file
#[derive(Clone)]
pub struct KubeReader {
    client: Client,
    context: String,
}

impl KubeReader {
    /// Build a client from the kubeconfig at `path`, using its current
    /// context.
    pub async fn connect(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|source| TopologyError::Kubeconfig {
            path: path.to_path_buf(),
            source,
        })?;
        let context = kubeconfig
            .current_context
            .clone()
            .filter(|ctx| !ctx.is_empty())
            .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|source| TopologyError::Kubeconfig {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(context = %context, cluster_url = %config.cluster_url, "Loaded kubeconfig");

        let client = Client::try_from(config).map_err(TopologyError::Connection)?;
        Ok(Self { client, context })
    }

    /// Wrap an existing client
    pub fn from_client(client: Client, context: impl Into<String>) -> Self {
        Self {
            client,
            context: context.into(),
        }
    }

    async fn list<K>(&self, namespace: &str) -> Result<Vec<K>, kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterReader for KubeReader {
    fn cluster_name(&self) -> &str {
        &self.context
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, kube::Error> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_daemon_sets(&self, namespace: &str) -> Result<Vec<DaemonSet>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>, kube::Error> {
        self.list(namespace).await
    }

    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>, kube::Error> {
        self.list(namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_connect_missing_kubeconfig() {
        let err = KubeReader::connect(Path::new("/nonexistent/k8sdd/kubeconfig"))
            .await
            .err()
            .unwrap();

        match err {
            TopologyError::Kubeconfig { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/k8sdd/kubeconfig"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_malformed_kubeconfig() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clusters: [this is: not valid").unwrap();

        let err = KubeReader::connect(file.path()).await.err().unwrap();
        assert!(matches!(err, TopologyError::Kubeconfig { .. }));
    }
}
