//! Identifier sanitization, diagram keys, workload icons and selector
//! matching

use crate::model::{Cluster, Labels, Namespace, Workload, WorkloadKind};
use std::collections::{HashMap, HashSet};

/// Prefix for Service node identifiers
pub const SERVICE_PREFIX: &str = "svc_";
/// Prefix for PVC node identifiers
pub const PVC_PREFIX: &str = "pvc_";
/// Suffix appended to a namespace identifier for its config summary node
pub const CONFIG_SUFFIX: &str = "_config";

/// Convert a Kubernetes resource name into a D2 identifier.
///
/// D2 keys cannot carry `-`, and `.` would be read as a nested path, so both
/// become `_`.
pub fn sanitize_id(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

pub fn service_id(name: &str) -> String {
    format!("{}{}", SERVICE_PREFIX, sanitize_id(name))
}

pub fn pvc_id(name: &str) -> String {
    format!("{}{}", PVC_PREFIX, sanitize_id(name))
}

pub fn config_id(namespace: &str) -> String {
    format!("{}{}", sanitize_id(namespace), CONFIG_SUFFIX)
}

/// D2 keywords. A node under one of these keys is read as an attribute of
/// its parent instead.
pub const RESERVED_KEYS: &[&str] = &[
    "label",
    "shape",
    "icon",
    "width",
    "height",
    "style",
    "constraint",
    "direction",
    "tooltip",
    "link",
    "near",
    "top",
    "left",
    "class",
    "classes",
    "vars",
    "layers",
    "scenarios",
    "steps",
];

pub fn is_reserved_key(id: &str) -> bool {
    RESERVED_KEYS.iter().any(|key| key.eq_ignore_ascii_case(id))
}

/// Hands out keys unique within one D2 scope. A key that is taken or
/// reserved gets `_2`, `_3`, ... appended.
#[derive(Debug, Default)]
struct KeyAllocator {
    taken: HashSet<String>,
}

impl KeyAllocator {
    fn allocate(&mut self, base: String) -> String {
        if !is_reserved_key(&base) && self.taken.insert(base.clone()) {
            return base;
        }

        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Root container key of every namespace, in namespace order
pub fn namespace_ids(cluster: &Cluster) -> Vec<String> {
    let mut keys = KeyAllocator::default();
    cluster
        .namespaces
        .iter()
        .map(|namespace| keys.allocate(sanitize_id(&namespace.name)))
        .collect()
}

/// Node keys inside one namespace container.
///
/// Keys are allocated in a fixed order (config summary, Services, claims,
/// then workloads), so the same namespace always yields the same keys and
/// a colliding workload is the one that gets a suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeIds {
    config: String,
    services: HashMap<String, String>,
    claims: HashMap<String, String>,
    workloads: HashMap<(WorkloadKind, String), String>,
}

impl NodeIds {
    pub fn for_namespace(namespace: &Namespace) -> Self {
        let mut keys = KeyAllocator::default();
        let mut ids = Self {
            config: keys.allocate(config_id(&namespace.name)),
            ..Self::default()
        };

        for service in &namespace.services {
            ids.services
                .entry(service.name.clone())
                .or_insert_with(|| keys.allocate(service_id(&service.name)));
        }

        let mounted = namespace
            .workloads()
            .flat_map(|workload| workload.volume_mounts.iter())
            .map(|mount| mount.claim_name.as_str());
        for claim in namespace.pvcs.iter().map(|pvc| pvc.name.as_str()).chain(mounted) {
            ids.claims
                .entry(claim.to_string())
                .or_insert_with(|| keys.allocate(pvc_id(claim)));
        }

        for workload in namespace.workloads() {
            ids.workloads
                .entry((workload.kind, workload.name.clone()))
                .or_insert_with(|| keys.allocate(sanitize_id(&workload.name)));
        }

        ids
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn service(&self, name: &str) -> String {
        self.services
            .get(name)
            .cloned()
            .unwrap_or_else(|| service_id(name))
    }

    pub fn claim(&self, name: &str) -> String {
        self.claims.get(name).cloned().unwrap_or_else(|| pvc_id(name))
    }

    pub fn workload(&self, workload: &Workload) -> String {
        self.workloads
            .get(&(workload.kind, workload.name.clone()))
            .cloned()
            .unwrap_or_else(|| sanitize_id(&workload.name))
    }
}

/// Glyph shown in front of a workload's name
pub fn workload_icon(kind: WorkloadKind) -> &'static str {
    match kind {
        WorkloadKind::StatefulSet => "◉",
        WorkloadKind::DaemonSet => "◈",
        WorkloadKind::Deployment => "●",
    }
}

/// Node label for a workload: `<icon> <name> (<replicas>)`, or
/// `<icon> <name>` for kinds that do not show a count.
pub fn workload_label(name: &str, kind: WorkloadKind, replicas: i32) -> String {
    let icon = workload_icon(kind);
    if kind.shows_replicas() {
        format!("{} {} ({})", icon, name, replicas)
    } else {
        format!("{} {}", icon, name)
    }
}

/// Config summary label: `CM: <n> | Sec: <n>`
pub fn config_label(config_maps: usize, secrets: usize) -> String {
    format!("CM: {} | Sec: {}", config_maps, secrets)
}

/// A selector matches when it is non-empty and every pair is present in
/// `labels` with the same value. An empty selector matches nothing.
pub fn labels_match(selector: &Labels, labels: &Labels) -> bool {
    if selector.is_empty() {
        return false;
    }
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

/// Name of the claim a StatefulSet creates for one replica of a
/// volume-claim template: `<template>-<statefulset>-<ordinal>`
pub fn stateful_claim_name(template: &str, owner: &str, ordinal: i32) -> String {
    format!("{}-{}-{}", template, owner, ordinal)
}
