//! Relationship derivation
//!
//! Edges are recomputed from the model on every render and never stored.

use crate::model::{format_mount_label, Namespace, VolumeMount};
use crate::naming::{labels_match, NodeIds};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    ServiceToWorkload,
    WorkloadToVolume,
}

/// A derived edge between two diagram identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub kind: ConnectionKind,
    pub label: Option<String>,
}

impl Connection {
    /// Edge text without its label: `from -> to`
    pub fn edge(&self) -> String {
        format!("{} -> {}", self.from, self.to)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} -> {}: {}", self.from, self.to, label),
            None => write!(f, "{} -> {}", self.from, self.to),
        }
    }
}

/// One edge per (Service, workload) pair whose selector matches, in
/// Service order then workload display order.
pub fn service_to_workload_edges(namespace: &Namespace) -> Vec<Connection> {
    let ids = NodeIds::for_namespace(namespace);
    let mut edges = Vec::new();

    for service in &namespace.services {
        for workload in namespace.workloads() {
            if labels_match(&service.selector, &workload.labels) {
                edges.push(Connection {
                    from: ids.service(&service.name),
                    to: ids.workload(workload),
                    kind: ConnectionKind::ServiceToWorkload,
                    label: None,
                });
            }
        }
    }

    edges
}

/// One edge per (workload, claim), labelled with every mount of that claim
/// in the order the mounts were encountered.
pub fn workload_to_volume_edges(namespace: &Namespace) -> Vec<Connection> {
    let ids = NodeIds::for_namespace(namespace);
    let mut edges = Vec::new();

    for workload in namespace.workloads() {
        for (claim, mounts) in group_by_claim(&workload.volume_mounts) {
            edges.push(Connection {
                from: ids.workload(workload),
                to: ids.claim(claim),
                kind: ConnectionKind::WorkloadToVolume,
                label: Some(format_mount_label(&mounts)),
            });
        }
    }

    edges
}

/// Group mounts by claim name, keeping first-seen claim order
pub fn group_by_claim(mounts: &[VolumeMount]) -> Vec<(&str, Vec<VolumeMount>)> {
    let mut groups: Vec<(&str, Vec<VolumeMount>)> = Vec::new();

    for mount in mounts {
        match groups
            .iter_mut()
            .find(|(claim, _)| *claim == mount.claim_name)
        {
            Some((_, group)) => group.push(mount.clone()),
            None => groups.push((mount.claim_name.as_str(), vec![mount.clone()])),
        }
    }

    groups
}
