//! Topology sources
//!
//! Two adapters produce the same `Cluster` model:
//! - `KubeReader` lists live resources through the Kubernetes API
//! - `FixtureParser` reads declarative YAML documents
//!
//! Both feed the shared `NamespaceBuilder`.

mod fixture;
mod live;

pub use self::fixture::{load_fixture_files, FixtureParser};
pub use self::live::KubeReader;

use crate::builder::{build_namespace, NamespaceResources};
use crate::error::{Result, TopologyError};
use crate::filter::{is_system_namespace, SystemResourcePolicy};
use crate::model::{Cluster, ResourceKind};
use crate::observability::TopologyLogger;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Secret, Service};

/// Cluster name used when the source does not provide one
pub const DEFAULT_CLUSTER_NAME: &str = "cluster";

/// Read-only access to the resources a topology is built from.
///
/// Every call returns the raw records of one kind; any error aborts the
/// whole fetch.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    fn cluster_name(&self) -> &str {
        DEFAULT_CLUSTER_NAME
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, kube::Error>;
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, kube::Error>;
    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>, kube::Error>;
    async fn list_daemon_sets(&self, namespace: &str) -> Result<Vec<DaemonSet>, kube::Error>;
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>, kube::Error>;
    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, kube::Error>;
    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>, kube::Error>;
    async fn list_pvcs(&self, namespace: &str)
        -> Result<Vec<PersistentVolumeClaim>, kube::Error>;
}

/// What to read from a live cluster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Read exactly this namespace, bypassing the system-namespace filter
    pub namespace: Option<String>,
    /// Keep system namespaces when listing all namespaces
    pub all_namespaces: bool,
    /// List PersistentVolumeClaims
    pub include_storage: bool,
    /// Count system-managed ConfigMaps/Secrets
    pub include_system_resources: bool,
}

impl FetchOptions {
    pub fn system_policy(&self) -> SystemResourcePolicy {
        if self.include_system_resources {
            SystemResourcePolicy::CountAll
        } else {
            SystemResourcePolicy::Exclude
        }
    }
}

/// Read a point-in-time topology snapshot.
///
/// Namespaces and kinds are read sequentially, so the model keeps the
/// order the API returned.
pub async fn fetch_topology<R>(
    reader: &R,
    options: &FetchOptions,
    logger: &TopologyLogger,
) -> Result<Cluster>
where
    R: ClusterReader + ?Sized,
{
    let namespace_names = resolve_namespaces(reader, options).await?;
    logger.log_fetch_started(&namespace_names);

    let mut namespaces = Vec::with_capacity(namespace_names.len());
    for name in &namespace_names {
        let resources = list_namespace(reader, name, options, logger).await?;
        let builder = build_namespace(name, &resources, options.system_policy())?;

        let (config_maps, secrets) = builder.filtered();
        logger.log_system_filtered(name, config_maps, secrets);

        let namespace = builder.finish();
        logger.log_namespace_built(&namespace);
        namespaces.push(namespace);
    }

    Ok(Cluster::new(reader.cluster_name(), namespaces))
}

/// A requested namespace is used as-is; otherwise every namespace is listed
/// and system namespaces dropped unless `all_namespaces` is set.
pub async fn resolve_namespaces<R>(reader: &R, options: &FetchOptions) -> Result<Vec<String>>
where
    R: ClusterReader + ?Sized,
{
    if let Some(namespace) = options.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        return Ok(vec![namespace.to_string()]);
    }

    let names = reader
        .list_namespaces()
        .await
        .map_err(TopologyError::ListNamespaces)?;

    Ok(filter_namespace_names(names, options.all_namespaces))
}

pub fn filter_namespace_names(names: Vec<String>, include_system: bool) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| include_system || !is_system_namespace(name))
        .collect()
}

async fn list_namespace<R>(
    reader: &R,
    namespace: &str,
    options: &FetchOptions,
    logger: &TopologyLogger,
) -> Result<NamespaceResources>
where
    R: ClusterReader + ?Sized,
{
    let wrap = |kind: ResourceKind| {
        move |source: kube::Error| TopologyError::List {
            kind,
            namespace: namespace.to_string(),
            source,
        }
    };

    let mut resources = NamespaceResources {
        deployments: reader
            .list_deployments(namespace)
            .await
            .map_err(wrap(ResourceKind::Deployment))?,
        stateful_sets: reader
            .list_stateful_sets(namespace)
            .await
            .map_err(wrap(ResourceKind::StatefulSet))?,
        daemon_sets: reader
            .list_daemon_sets(namespace)
            .await
            .map_err(wrap(ResourceKind::DaemonSet))?,
        services: reader
            .list_services(namespace)
            .await
            .map_err(wrap(ResourceKind::Service))?,
        config_maps: reader
            .list_config_maps(namespace)
            .await
            .map_err(wrap(ResourceKind::ConfigMap))?,
        secrets: reader
            .list_secrets(namespace)
            .await
            .map_err(wrap(ResourceKind::Secret))?,
        pvcs: Vec::new(),
    };

    if options.include_storage {
        resources.pvcs = reader
            .list_pvcs(namespace)
            .await
            .map_err(wrap(ResourceKind::PersistentVolumeClaim))?;
    }

    logger.log_listed(namespace, ResourceKind::Deployment, resources.deployments.len());
    logger.log_listed(namespace, ResourceKind::StatefulSet, resources.stateful_sets.len());
    logger.log_listed(namespace, ResourceKind::DaemonSet, resources.daemon_sets.len());
    logger.log_listed(namespace, ResourceKind::Service, resources.services.len());
    logger.log_listed(namespace, ResourceKind::ConfigMap, resources.config_maps.len());
    logger.log_listed(namespace, ResourceKind::Secret, resources.secrets.len());
    if options.include_storage {
        logger.log_listed(namespace, ResourceKind::PersistentVolumeClaim, resources.pvcs.len());
    }

    Ok(resources)
}
