//! Shared topology builder
//!
//! Both the live cluster reader and the fixture parser hand their raw
//! records to `NamespaceBuilder`, so the two sources cannot drift apart in
//! how a record becomes a model entity.

use crate::correlate::{correlate, ClaimTemplates};
use crate::error::{Result, TopologyError};
use crate::filter::SystemResourcePolicy;
use crate::model::{Labels, Namespace, Port, Pvc, ResourceKind, Service, ServiceType, Workload, WorkloadKind};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, PersistentVolumeClaim, PodTemplateSpec, Secret, Service as K8sService, Volume,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Raw records of one namespace, in the order they were listed
#[derive(Debug, Clone, Default)]
pub struct NamespaceResources {
    pub deployments: Vec<Deployment>,
    pub stateful_sets: Vec<StatefulSet>,
    pub daemon_sets: Vec<DaemonSet>,
    pub services: Vec<K8sService>,
    pub config_maps: Vec<ConfigMap>,
    pub secrets: Vec<Secret>,
    pub pvcs: Vec<PersistentVolumeClaim>,
}

/// Accumulates model entities for one namespace
#[derive(Debug)]
pub struct NamespaceBuilder {
    namespace: Namespace,
    policy: SystemResourcePolicy,
    filtered_config_maps: usize,
    filtered_secrets: usize,
}

impl NamespaceBuilder {
    pub fn new(name: impl Into<String>, policy: SystemResourcePolicy) -> Self {
        Self {
            namespace: Namespace::new(name),
            policy,
            filtered_config_maps: 0,
            filtered_secrets: 0,
        }
    }

    pub fn add_deployment(&mut self, deployment: &Deployment) -> Result<()> {
        let name = object_name(&deployment.metadata, ResourceKind::Deployment)?;
        let spec = deployment
            .spec
            .as_ref()
            .ok_or_else(|| missing_spec(ResourceKind::Deployment, name))?;
        let (containers, volumes) = pod_parts(&spec.template);

        self.namespace.deployments.push(Workload {
            name: name.to_string(),
            kind: WorkloadKind::Deployment,
            replicas: spec.replicas.unwrap_or(1),
            labels: workload_labels(&spec.selector, &spec.template),
            volume_mounts: correlate(containers, volumes, None),
        });
        Ok(())
    }

    pub fn add_stateful_set(&mut self, stateful_set: &StatefulSet) -> Result<()> {
        let name = object_name(&stateful_set.metadata, ResourceKind::StatefulSet)?;
        let spec = stateful_set
            .spec
            .as_ref()
            .ok_or_else(|| missing_spec(ResourceKind::StatefulSet, name))?;
        let (containers, volumes) = pod_parts(&spec.template);
        let replicas = spec.replicas.unwrap_or(1);

        let templates = ClaimTemplates {
            templates: spec.volume_claim_templates.as_deref().unwrap_or_default(),
            owner: name,
            replicas,
        };

        self.namespace.stateful_sets.push(Workload {
            name: name.to_string(),
            kind: WorkloadKind::StatefulSet,
            replicas,
            labels: workload_labels(&spec.selector, &spec.template),
            volume_mounts: correlate(containers, volumes, Some(templates)),
        });
        Ok(())
    }

    pub fn add_daemon_set(&mut self, daemon_set: &DaemonSet) -> Result<()> {
        let name = object_name(&daemon_set.metadata, ResourceKind::DaemonSet)?;
        let spec = daemon_set
            .spec
            .as_ref()
            .ok_or_else(|| missing_spec(ResourceKind::DaemonSet, name))?;
        let (containers, volumes) = pod_parts(&spec.template);

        // Declarative documents carry no status, so they schedule on 0 nodes
        let desired = daemon_set
            .status
            .as_ref()
            .map(|status| status.desired_number_scheduled)
            .unwrap_or(0);

        self.namespace.daemon_sets.push(Workload {
            name: name.to_string(),
            kind: WorkloadKind::DaemonSet,
            replicas: desired,
            labels: workload_labels(&spec.selector, &spec.template),
            volume_mounts: correlate(containers, volumes, None),
        });
        Ok(())
    }

    pub fn add_service(&mut self, service: &K8sService) -> Result<()> {
        let name = object_name(&service.metadata, ResourceKind::Service)?;
        let spec = service.spec.as_ref();

        let ports: Vec<Port> = spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| Port {
                        name: p.name.clone(),
                        port: p.port,
                        target_port: match &p.target_port {
                            Some(IntOrString::Int(port)) => *port,
                            _ => 0,
                        },
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.namespace.services.push(Service {
            name: name.to_string(),
            service_type: ServiceType::parse(spec.and_then(|s| s.type_.as_deref())),
            selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
            ports,
        });
        Ok(())
    }

    pub fn add_pvc(&mut self, pvc: &PersistentVolumeClaim) -> Result<()> {
        let name = object_name(&pvc.metadata, ResourceKind::PersistentVolumeClaim)?;

        let storage_class = pvc
            .spec
            .as_ref()
            .and_then(|s| s.storage_class_name.clone())
            .unwrap_or_default();

        // Bound claims report their real size; unbound ones only the request
        let capacity = pvc
            .status
            .as_ref()
            .and_then(|s| s.capacity.as_ref())
            .and_then(|c| c.get("storage"))
            .or_else(|| {
                pvc.spec
                    .as_ref()
                    .and_then(|s| s.resources.as_ref())
                    .and_then(|r| r.requests.as_ref())
                    .and_then(|r| r.get("storage"))
            })
            .map(|q| q.0.clone())
            .unwrap_or_default();

        self.namespace.pvcs.push(Pvc {
            name: name.to_string(),
            storage_class,
            capacity,
            bound_pod: String::new(),
        });
        Ok(())
    }

    /// Count a ConfigMap; returns false when the policy filtered it out
    pub fn add_config_map(&mut self, config_map: &ConfigMap) -> Result<bool> {
        let name = object_name(&config_map.metadata, ResourceKind::ConfigMap)?;
        if self.policy.counts_config_map(name) {
            self.namespace.config_maps += 1;
            Ok(true)
        } else {
            self.filtered_config_maps += 1;
            Ok(false)
        }
    }

    /// Count a Secret; returns false when the policy filtered it out
    pub fn add_secret(&mut self, secret: &Secret) -> Result<bool> {
        let name = object_name(&secret.metadata, ResourceKind::Secret)?;
        if self.policy.counts_secret(name, secret.type_.as_deref()) {
            self.namespace.secrets += 1;
            Ok(true)
        } else {
            self.filtered_secrets += 1;
            Ok(false)
        }
    }

    /// Number of (ConfigMaps, Secrets) dropped as system-managed
    pub fn filtered(&self) -> (usize, usize) {
        (self.filtered_config_maps, self.filtered_secrets)
    }

    pub fn finish(self) -> Namespace {
        self.namespace
    }
}

/// Build a namespace from a complete set of records, failing on the first
/// unusable one
pub fn build_namespace(
    name: &str,
    resources: &NamespaceResources,
    policy: SystemResourcePolicy,
) -> Result<NamespaceBuilder> {
    let mut builder = NamespaceBuilder::new(name, policy);

    for deployment in &resources.deployments {
        builder.add_deployment(deployment)?;
    }
    for stateful_set in &resources.stateful_sets {
        builder.add_stateful_set(stateful_set)?;
    }
    for daemon_set in &resources.daemon_sets {
        builder.add_daemon_set(daemon_set)?;
    }
    for service in &resources.services {
        builder.add_service(service)?;
    }
    for config_map in &resources.config_maps {
        builder.add_config_map(config_map)?;
    }
    for secret in &resources.secrets {
        builder.add_secret(secret)?;
    }
    for pvc in &resources.pvcs {
        builder.add_pvc(pvc)?;
    }

    Ok(builder)
}

fn object_name(metadata: &ObjectMeta, kind: ResourceKind) -> Result<&str> {
    metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TopologyError::missing_name(kind))
}

fn missing_spec(kind: ResourceKind, name: &str) -> TopologyError {
    TopologyError::InvalidResource {
        kind,
        reason: format!("`{}` has no spec", name),
    }
}

/// Labels a Service selector is matched against: the pod template labels,
/// or the selector's matchLabels when the template carries none
fn workload_labels(selector: &LabelSelector, template: &PodTemplateSpec) -> Labels {
    template
        .metadata
        .as_ref()
        .and_then(|m| m.labels.clone())
        .filter(|labels| !labels.is_empty())
        .or_else(|| selector.match_labels.clone())
        .unwrap_or_default()
}

fn pod_parts(template: &PodTemplateSpec) -> (&[Container], &[Volume]) {
    match template.spec.as_ref() {
        Some(spec) => (
            spec.containers.as_slice(),
            spec.volumes.as_deref().unwrap_or_default(),
        ),
        None => (&[], &[]),
    }
}
