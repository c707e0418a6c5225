//! Core topology model
//!
//! A `Cluster` is built once per invocation from a single snapshot (live
//! cluster or fixture documents) and is never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label set or selector, ordered for stable output
pub type Labels = BTreeMap<String, String>;

/// Root of a topology snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub namespaces: Vec<Namespace>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, namespaces: Vec<Namespace>) -> Self {
        Self {
            name: name.into(),
            namespaces,
        }
    }

    /// Find a namespace by name
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }
}

/// A namespace and the resources shown for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub deployments: Vec<Workload>,
    pub stateful_sets: Vec<Workload>,
    pub daemon_sets: Vec<Workload>,
    pub services: Vec<Service>,
    pub pvcs: Vec<Pvc>,
    pub config_maps: usize,
    pub secrets: usize,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// All workloads in display order: Deployments, StatefulSets, DaemonSets
    pub fn workloads(&self) -> impl Iterator<Item = &Workload> {
        self.deployments
            .iter()
            .chain(self.stateful_sets.iter())
            .chain(self.daemon_sets.iter())
    }

    /// Whether a ConfigMap/Secret summary node is shown for this namespace
    pub fn has_config(&self) -> bool {
        self.config_maps > 0 || self.secrets > 0
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
            && self.stateful_sets.is_empty()
            && self.daemon_sets.is_empty()
            && self.services.is_empty()
            && self.pvcs.is_empty()
            && !self.has_config()
    }
}

/// Workload flavour; dictates the icon and whether a replica count is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }

    /// DaemonSets are scheduled per node and never show a count
    pub fn shows_replicas(&self) -> bool {
        !matches!(self, WorkloadKind::DaemonSet)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub kind: WorkloadKind,
    /// Declared replicas, or desired scheduled count for DaemonSets
    pub replicas: i32,
    pub labels: Labels,
    pub volume_mounts: Vec<VolumeMount>,
}

/// A storage claim mounted into a workload's containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub claim_name: String,
    pub mount_path: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn access_mode(&self) -> &'static str {
        if self.read_only {
            "ro"
        } else {
            "rw"
        }
    }
}

/// Line-break marker understood inside D2 label strings
pub const LABEL_LINE_BREAK: &str = "\\n";

/// Compact label for a group of mounts of the same claim.
///
/// Single mount: `/var/log/app (rw)`. Multiple mounts are joined with the
/// D2 line-break marker in encounter order: `/data (rw)\n/backup (ro)`.
pub fn format_mount_label(mounts: &[VolumeMount]) -> String {
    mounts
        .iter()
        .map(|m| format!("{} ({})", m.mount_path, m.access_mode()))
        .collect::<Vec<_>>()
        .join(LABEL_LINE_BREAK)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
    ExternalName,
}

impl ServiceType {
    /// Parse the API's service type string; unset means ClusterIP
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("NodePort") => ServiceType::NodePort,
            Some("LoadBalancer") => ServiceType::LoadBalancer,
            Some("ExternalName") => ServiceType::ExternalName,
            _ => ServiceType::ClusterIP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub service_type: ServiceType,
    pub selector: Labels,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: Option<String>,
    pub port: i32,
    pub target_port: i32,
}

/// PersistentVolumeClaim summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pvc {
    pub name: String,
    pub storage_class: String,
    pub capacity: String,
    /// Not populated yet
    pub bound_pod: String,
}

/// Resource kinds read from a cluster or fixture set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Namespace,
    Deployment,
    StatefulSet,
    DaemonSet,
    Service,
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::StatefulSet => "StatefulSet",
            ResourceKind::DaemonSet => "DaemonSet",
            ResourceKind::Service => "Service",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WorkloadKind> for ResourceKind {
    fn from(kind: WorkloadKind) -> Self {
        match kind {
            WorkloadKind::Deployment => ResourceKind::Deployment,
            WorkloadKind::StatefulSet => ResourceKind::StatefulSet,
            WorkloadKind::DaemonSet => ResourceKind::DaemonSet,
        }
    }
}
