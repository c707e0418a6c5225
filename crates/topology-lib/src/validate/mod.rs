//! Diagram validation
//!
//! `D2Validator` checks rendered D2 text against an independently built
//! `Cluster`. Every property is its own check with its own failure variant,
//! so a caller can tell exactly what broke.

mod graph;

pub use self::graph::{Container, DiagramGraph, Edge, Node};

use crate::model::{Cluster, Namespace, WorkloadKind};
use crate::naming::{config_label, namespace_ids, workload_label, NodeIds};
use crate::relationships::{service_to_workload_edges, workload_to_volume_edges};
use serde::Serialize;
use thiserror::Error;

const DIRECTION_KEY: &str = "direction";

/// One broken property of a rendered diagram
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum ValidationFailure {
    #[error("unbalanced braces: {open} opening vs {close} closing")]
    UnbalancedBraces { open: usize, close: usize },

    #[error("missing `direction:` header")]
    MissingDirection,

    #[error("missing namespace container `{id}`")]
    MissingNamespace { id: String },

    #[error("namespace container `{id}` is declared more than once")]
    DuplicateNamespace { id: String },

    #[error("node `{id}` is declared more than once in namespace `{namespace}`")]
    DuplicateNode { namespace: String, id: String },

    #[error("missing workload node `{id}` in namespace `{namespace}`")]
    MissingWorkload { namespace: String, id: String },

    #[error("missing service node `{id}` in namespace `{namespace}`")]
    MissingService { namespace: String, id: String },

    #[error("missing PVC node `{id}` in namespace `{namespace}`")]
    MissingPvc { namespace: String, id: String },

    #[error("missing config node `{id}` in namespace `{namespace}`")]
    MissingConfigNode { namespace: String, id: String },

    #[error("{kind} `{name}` should be labelled `{expected}`")]
    IncorrectWorkloadLabel {
        name: String,
        kind: WorkloadKind,
        expected: String,
    },

    #[error("missing service connection `{edge}`")]
    MissingServiceConnection { edge: String },

    #[error("missing volume connection `{edge}`")]
    MissingVolumeConnection { edge: String },

    #[error("volume connection `{edge}` is labelled {found:?}, expected `{expected}`")]
    IncorrectVolumeLabel {
        edge: String,
        expected: String,
        found: Option<String>,
    },

    #[error("namespace `{namespace}` should show `CM: {expected}`")]
    IncorrectConfigMapCount { namespace: String, expected: usize },

    #[error("namespace `{namespace}` should show `Sec: {expected}`")]
    IncorrectSecretCount { namespace: String, expected: usize },
}

/// Outcome of one named check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub failures: Vec<ValidationFailure>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Every check, in run order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationFailure> {
        self.checks.iter().flat_map(|check| check.failures.iter())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn check(&self, name: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|check| check.name == name)
    }
}

type Check<'a> = fn(&D2Validator<'a>) -> Vec<ValidationFailure>;

pub struct D2Validator<'a> {
    expected: &'a Cluster,
    text: &'a str,
    graph: DiagramGraph,
    namespace_keys: Vec<String>,
}

impl<'a> D2Validator<'a> {
    pub fn new(expected: &'a Cluster, text: &'a str) -> Self {
        Self {
            expected,
            text,
            graph: DiagramGraph::parse(text),
            namespace_keys: namespace_ids(expected),
        }
    }

    /// Braces balance and the direction header is present
    pub fn validate_syntax(&self) -> Result<(), ValidationFailure> {
        first(self.syntax_failures())
    }

    /// Every namespace, workload, service and PVC has a node, and no key is
    /// declared twice in the same scope
    pub fn validate_resources(&self) -> Result<(), ValidationFailure> {
        first(self.resource_failures())
    }

    /// Workload nodes carry `<icon> <name> (<replicas>)`, or `<icon> <name>`
    /// for DaemonSets
    pub fn validate_workload_labels(&self) -> Result<(), ValidationFailure> {
        first(self.workload_label_failures())
    }

    pub fn validate_service_connections(&self) -> Result<(), ValidationFailure> {
        first(self.service_connection_failures())
    }

    /// Every derived workload-to-claim edge exists with its mount label
    pub fn validate_volume_connections(&self) -> Result<(), ValidationFailure> {
        first(self.volume_connection_failures())
    }

    pub fn validate_config_info(&self) -> Result<(), ValidationFailure> {
        first(self.config_failures())
    }

    /// Run every check and collect all failures
    pub fn report(&self) -> ValidationReport {
        let checks: [(&'static str, Check<'a>); 6] = [
            ("syntax", Self::syntax_failures),
            ("resources", Self::resource_failures),
            ("workload_labels", Self::workload_label_failures),
            ("service_connections", Self::service_connection_failures),
            ("volume_connections", Self::volume_connection_failures),
            ("config_info", Self::config_failures),
        ];

        ValidationReport {
            checks: checks
                .iter()
                .map(|(name, check)| CheckOutcome {
                    name: *name,
                    failures: check(self),
                })
                .collect(),
        }
    }

    pub fn graph(&self) -> &DiagramGraph {
        &self.graph
    }

    fn syntax_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        let open = self.text.matches('{').count();
        let close = self.text.matches('}').count();
        if open != close {
            failures.push(ValidationFailure::UnbalancedBraces { open, close });
        }

        let has_direction = self
            .text
            .lines()
            .any(|line| line.trim_start().starts_with(&format!("{}:", DIRECTION_KEY)));
        if !has_direction {
            failures.push(ValidationFailure::MissingDirection);
        }

        failures
    }

    fn resource_failures(&self) -> Vec<ValidationFailure> {
        let mut failures: Vec<ValidationFailure> = self
            .graph
            .duplicate_containers()
            .into_iter()
            .map(|id| ValidationFailure::DuplicateNamespace { id: id.to_string() })
            .collect();

        for (namespace, key) in self.namespaces() {
            let Some(container) = self.graph.container(key) else {
                failures.push(ValidationFailure::MissingNamespace { id: key.to_string() });
                continue;
            };
            let ids = NodeIds::for_namespace(namespace);
            let missing = |id: &str| container.node(id).is_none();

            for workload in namespace.workloads() {
                let id = ids.workload(workload);
                if missing(id.as_str()) {
                    failures.push(ValidationFailure::MissingWorkload {
                        namespace: namespace.name.clone(),
                        id,
                    });
                }
            }
            for service in &namespace.services {
                let id = ids.service(&service.name);
                if missing(id.as_str()) {
                    failures.push(ValidationFailure::MissingService {
                        namespace: namespace.name.clone(),
                        id,
                    });
                }
            }
            for pvc in &namespace.pvcs {
                let id = ids.claim(&pvc.name);
                if missing(id.as_str()) {
                    failures.push(ValidationFailure::MissingPvc {
                        namespace: namespace.name.clone(),
                        id,
                    });
                }
            }
            for id in container.duplicate_nodes() {
                failures.push(ValidationFailure::DuplicateNode {
                    namespace: namespace.name.clone(),
                    id: id.to_string(),
                });
            }
        }

        failures
    }

    fn workload_label_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for (namespace, key) in self.namespaces() {
            let container = self.graph.container(key);
            let ids = NodeIds::for_namespace(namespace);

            for workload in namespace.workloads() {
                let expected = workload_label(&workload.name, workload.kind, workload.replicas);
                let found = container
                    .and_then(|c| c.node(&ids.workload(workload)))
                    .and_then(|node| node.label.as_deref());
                if found != Some(expected.as_str()) {
                    failures.push(ValidationFailure::IncorrectWorkloadLabel {
                        name: workload.name.clone(),
                        kind: workload.kind,
                        expected,
                    });
                }
            }
        }

        failures
    }

    fn service_connection_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for (namespace, key) in self.namespaces() {
            let container = self.graph.container(key);
            for connection in service_to_workload_edges(namespace) {
                if container
                    .and_then(|c| c.edge(&connection.from, &connection.to))
                    .is_none()
                {
                    failures.push(ValidationFailure::MissingServiceConnection {
                        edge: connection.edge(),
                    });
                }
            }
        }

        failures
    }

    fn volume_connection_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for (namespace, key) in self.namespaces() {
            let container = self.graph.container(key);

            for connection in workload_to_volume_edges(namespace) {
                let found = container.and_then(|c| c.edge(&connection.from, &connection.to));
                let expected = connection.label.clone().unwrap_or_default();

                match found {
                    None => failures.push(ValidationFailure::MissingVolumeConnection {
                        edge: connection.edge(),
                    }),
                    Some(edge) if edge.label.as_deref() != Some(expected.as_str()) => {
                        failures.push(ValidationFailure::IncorrectVolumeLabel {
                            edge: connection.edge(),
                            expected,
                            found: edge.label.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        failures
    }

    /// Compares each namespace's own config node; another namespace's
    /// summary never satisfies it.
    fn config_failures(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();

        for (namespace, key) in self.namespaces() {
            if !namespace.has_config() {
                continue;
            }
            let ids = NodeIds::for_namespace(namespace);
            let node = self
                .graph
                .container(key)
                .and_then(|c| c.node(ids.config()));
            let Some(node) = node else {
                failures.push(ValidationFailure::MissingConfigNode {
                    namespace: namespace.name.clone(),
                    id: ids.config().to_string(),
                });
                continue;
            };

            let label = node.label.as_deref().unwrap_or_default();
            if label == config_label(namespace.config_maps, namespace.secrets) {
                continue;
            }
            if !label.starts_with(&format!("CM: {} |", namespace.config_maps)) {
                failures.push(ValidationFailure::IncorrectConfigMapCount {
                    namespace: namespace.name.clone(),
                    expected: namespace.config_maps,
                });
            }
            if !label.ends_with(&format!("| Sec: {}", namespace.secrets)) {
                failures.push(ValidationFailure::IncorrectSecretCount {
                    namespace: namespace.name.clone(),
                    expected: namespace.secrets,
                });
            }
        }

        failures
    }

    /// Expected namespaces paired with their container keys
    fn namespaces(&self) -> impl Iterator<Item = (&'a Namespace, &str)> + '_ {
        self.expected
            .namespaces
            .iter()
            .zip(self.namespace_keys.iter().map(String::as_str))
    }
}

fn first(failures: Vec<ValidationFailure>) -> Result<(), ValidationFailure> {
    match failures.into_iter().next() {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Labels, Namespace, Service, ServiceType, VolumeMount, Workload};
    use crate::render::{render_to_string, RenderOptions};

    fn app(name: &str) -> Labels {
        Labels::from([("app".to_string(), name.to_string())])
    }

    fn cluster() -> Cluster {
        let mut ns = Namespace::new("demo");
        ns.deployments.push(Workload {
            name: "web".to_string(),
            kind: WorkloadKind::Deployment,
            replicas: 3,
            labels: app("web"),
            volume_mounts: vec![VolumeMount {
                claim_name: "cache".to_string(),
                mount_path: "/cache".to_string(),
                read_only: false,
            }],
        });
        ns.daemon_sets.push(Workload {
            name: "agent".to_string(),
            kind: WorkloadKind::DaemonSet,
            replicas: 5,
            labels: app("agent"),
            volume_mounts: Vec::new(),
        });
        ns.services.push(Service {
            name: "web-svc".to_string(),
            service_type: ServiceType::ClusterIP,
            selector: app("web"),
            ports: Vec::new(),
        });
        ns.config_maps = 2;
        ns.secrets = 1;
        Cluster::new("cluster", vec![ns])
    }

    #[test]
    fn test_rendered_output_passes_every_check() {
        let cluster = cluster();
        let text = render_to_string(&cluster, &RenderOptions::default());
        let validator = D2Validator::new(&cluster, &text);

        let report = validator.report();
        assert!(report.passed(), "unexpected failures: {:?}", report);
        assert_eq!(report.checks.len(), 6);
        assert!(validator.validate_syntax().is_ok());
        assert!(validator.validate_volume_connections().is_ok());
    }

    #[test]
    fn test_syntax_failures() {
        let cluster = Cluster::new("cluster", Vec::new());
        let validator = D2Validator::new(&cluster, "demo: {\n");

        let report = validator.report();
        let syntax = report.check("syntax").unwrap();
        assert_eq!(
            syntax.failures,
            vec![
                ValidationFailure::UnbalancedBraces { open: 1, close: 0 },
                ValidationFailure::MissingDirection,
            ]
        );
    }

    #[test]
    fn test_missing_service_connection_is_named() {
        let cluster = cluster();
        let text = render_to_string(&cluster, &RenderOptions::default()).replace("svc_web_svc -> web\n", "");

        let err = D2Validator::new(&cluster, &text)
            .validate_service_connections()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::MissingServiceConnection {
                edge: "svc_web_svc -> web".to_string()
            }
        );
    }

    #[test]
    fn test_daemon_set_label_with_count_fails() {
        let cluster = cluster();
        let text = render_to_string(&cluster, &RenderOptions::default()).replace("\"◈ agent\"", "\"◈ agent (5)\"");

        let err = D2Validator::new(&cluster, &text)
            .validate_workload_labels()
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationFailure::IncorrectWorkloadLabel { ref name, kind: WorkloadKind::DaemonSet, .. } if name == "agent"
        ));
    }

    #[test]
    fn test_volume_label_mismatch() {
        let cluster = cluster();
        let text = render_to_string(&cluster, &RenderOptions::default()).replace("/cache (rw)", "/cache (ro)");

        let err = D2Validator::new(&cluster, &text)
            .validate_volume_connections()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::IncorrectVolumeLabel {
                edge: "web -> pvc_cache".to_string(),
                expected: "/cache (rw)".to_string(),
                found: Some("/cache (ro)".to_string()),
            }
        );
    }

    #[test]
    fn test_config_counts() {
        let cluster = cluster();
        let text = render_to_string(&cluster, &RenderOptions::default()).replace("CM: 2 | Sec: 1", "CM: 3 | Sec: 1");

        let report = D2Validator::new(&cluster, &text).report();
        let config = report.check("config_info").unwrap();
        assert_eq!(
            config.failures,
            vec![ValidationFailure::IncorrectConfigMapCount {
                namespace: "demo".to_string(),
                expected: 2,
            }]
        );
        assert_eq!(report.failure_count(), 1);
    }

    fn deployment(name: &str, replicas: i32) -> Workload {
        Workload {
            name: name.to_string(),
            kind: WorkloadKind::Deployment,
            replicas,
            labels: app(name),
            volume_mounts: Vec::new(),
        }
    }

    #[test]
    fn test_reserved_and_colliding_names_pass() {
        let mut ns = Namespace::new("label");
        ns.deployments.push(deployment("label", 1));
        ns.deployments.push(deployment("style", 2));
        ns.deployments.push(deployment("api-v1", 1));
        ns.deployments.push(deployment("api.v1", 3));
        ns.deployments.push(deployment("svc-web", 2));
        ns.services.push(Service {
            name: "web".to_string(),
            service_type: ServiceType::ClusterIP,
            selector: app("svc-web"),
            ports: Vec::new(),
        });
        let cluster = Cluster::new("cluster", vec![ns]);
        let text = render_to_string(&cluster, &RenderOptions::default());

        let validator = D2Validator::new(&cluster, &text);
        let report = validator.report();
        assert!(report.passed(), "unexpected failures: {:?}", report);

        let container = validator.graph().container("label_2").unwrap();
        assert_eq!(container.label.as_deref(), Some("label"));
        assert_eq!(
            container.node("label_2").unwrap().label.as_deref(),
            Some("● label (1)")
        );
        assert!(container.duplicate_nodes().is_empty());
    }

    #[test]
    fn test_duplicate_node_keys_fail() {
        let mut ns = Namespace::new("demo");
        ns.deployments.push(deployment("api-v1", 1));
        ns.deployments.push(deployment("api.v1", 3));
        let cluster = Cluster::new("cluster", vec![ns]);
        // both workloads squeezed onto one key, as a naive sanitizer would
        let text = render_to_string(&cluster, &RenderOptions::default()).replace("api_v1_2", "api_v1");

        let report = D2Validator::new(&cluster, &text).report();

        let resources = report.check("resources").unwrap();
        assert!(resources.failures.contains(&ValidationFailure::DuplicateNode {
            namespace: "demo".to_string(),
            id: "api_v1".to_string(),
        }));
        assert!(resources.failures.contains(&ValidationFailure::MissingWorkload {
            namespace: "demo".to_string(),
            id: "api_v1_2".to_string(),
        }));
    }

    #[test]
    fn test_duplicate_namespace_fails() {
        let cluster = Cluster::new("cluster", vec![Namespace::new("demo")]);
        let text = "direction: right\n\ndemo: {\n}\ndemo: {\n}\n";

        let report = D2Validator::new(&cluster, text).report();
        assert_eq!(
            report.check("resources").unwrap().failures,
            vec![ValidationFailure::DuplicateNamespace { id: "demo".to_string() }]
        );
    }

    #[test]
    fn test_config_counts_are_scoped_to_their_namespace() {
        let mut shop = Namespace::new("shop");
        shop.config_maps = 2;
        shop.secrets = 1;
        let mut blog = Namespace::new("blog");
        blog.config_maps = 1;
        blog.secrets = 1;
        let cluster = Cluster::new("cluster", vec![shop, blog]);

        // blog now claims shop's counts; shop's summary must not cover it
        let text = render_to_string(&cluster, &RenderOptions::default())
            .replace("CM: 1 | Sec: 1", "CM: 2 | Sec: 1");

        let report = D2Validator::new(&cluster, &text).report();
        assert_eq!(
            report.check("config_info").unwrap().failures,
            vec![ValidationFailure::IncorrectConfigMapCount {
                namespace: "blog".to_string(),
                expected: 1,
            }]
        );
    }

    #[test]
    fn test_workload_label_in_wrong_namespace_fails() {
        let mut shop = Namespace::new("shop");
        shop.deployments.push(deployment("web", 3));
        let mut blog = Namespace::new("blog");
        blog.deployments.push(deployment("web", 1));
        let cluster = Cluster::new("cluster", vec![shop, blog]);

        let text = render_to_string(&cluster, &RenderOptions::default())
            .replace("● web (1)", "● web (3)");

        let err = D2Validator::new(&cluster, &text)
            .validate_workload_labels()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationFailure::IncorrectWorkloadLabel {
                name: "web".to_string(),
                kind: WorkloadKind::Deployment,
                expected: "● web (1)".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_namespace_skips_its_children() {
        let cluster = cluster();
        let report = D2Validator::new(&cluster, "direction: right\n").report();

        assert_eq!(
            report.check("resources").unwrap().failures,
            vec![ValidationFailure::MissingNamespace { id: "demo".to_string() }]
        );
        assert!(!report.passed());
    }

    #[test]
    fn test_failure_serializes_with_tag() {
        let failure = ValidationFailure::MissingPvc {
            namespace: "demo".to_string(),
            id: "pvc_data".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["failure"], "missing_pvc");
        assert_eq!(json["id"], "pvc_data");
        assert_eq!(failure.to_string(), "missing PVC node `pvc_data` in namespace `demo`");
    }
}
