//! System-managed resource detection
//!
//! Control-plane namespaces and the ConfigMaps/Secrets that Kubernetes,
//! service meshes and Helm inject into every namespace are hidden from the
//! diagram unless explicitly requested.

const SYSTEM_NAMESPACES: &[&str] = &["default", "kube-system", "kube-public", "kube-node-lease"];
const SYSTEM_NAMESPACE_PREFIXES: &[&str] = &["kube-", "openshift-", "istio-"];

const SYSTEM_CONFIG_MAPS: &[&str] = &[
    // Cluster CA bundle, injected in all namespaces
    "kube-root-ca.crt",
    "istio-ca-root-cert",
    "linkerd-config",
];
const SYSTEM_CONFIG_MAP_PREFIXES: &[&str] = &["kube-", "openshift-"];

const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
const SYSTEM_SECRET_PREFIXES: &[&str] = &["default-token-", "sh.helm."];

/// Whether system-managed ConfigMaps and Secrets are counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemResourcePolicy {
    /// Drop system-managed ConfigMaps/Secrets from the counts
    #[default]
    Exclude,
    /// Count every ConfigMap/Secret
    CountAll,
}

impl SystemResourcePolicy {
    pub fn counts_config_map(&self, name: &str) -> bool {
        matches!(self, SystemResourcePolicy::CountAll) || !is_system_config_map(name)
    }

    pub fn counts_secret(&self, name: &str, secret_type: Option<&str>) -> bool {
        matches!(self, SystemResourcePolicy::CountAll) || !is_system_secret(name, secret_type)
    }
}

pub fn is_system_namespace(name: &str) -> bool {
    SYSTEM_NAMESPACES.contains(&name) || has_any_prefix(name, SYSTEM_NAMESPACE_PREFIXES)
}

pub fn is_system_config_map(name: &str) -> bool {
    SYSTEM_CONFIG_MAPS.contains(&name) || has_any_prefix(name, SYSTEM_CONFIG_MAP_PREFIXES)
}

pub fn is_system_secret(name: &str, secret_type: Option<&str>) -> bool {
    secret_type == Some(SERVICE_ACCOUNT_TOKEN_TYPE) || has_any_prefix(name, SYSTEM_SECRET_PREFIXES)
}

fn has_any_prefix(name: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| name.starts_with(prefix))
}
