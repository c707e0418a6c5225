//! Structured logging for topology events
//!
//! `TopologyLogger` is handed to the fetch and parse entry points instead of
//! relying on process-wide state. A disabled logger drops every event, which
//! keeps library callers that do not want diagnostics quiet without touching
//! the global subscriber.

use crate::model::{Namespace, ResourceKind};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TopologyLogger {
    source: String,
    enabled: bool,
}

impl TopologyLogger {
    /// Logger tagging every event with the snapshot source (cluster context
    /// or fixture set name)
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            enabled: true,
        }
    }

    /// Logger that emits nothing
    pub fn disabled() -> Self {
        Self {
            source: String::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log the start of a topology fetch
    pub fn log_fetch_started(&self, namespaces: &[String]) {
        if !self.enabled {
            return;
        }
        info!(
            event = "fetch_started",
            source = %self.source,
            namespaces = namespaces.len(),
            "Fetching cluster topology"
        );
    }

    /// Log a namespace whose resources were fully read
    pub fn log_namespace_built(&self, namespace: &Namespace) {
        if !self.enabled {
            return;
        }
        debug!(
            event = "namespace_built",
            source = %self.source,
            namespace = %namespace.name,
            deployments = namespace.deployments.len(),
            stateful_sets = namespace.stateful_sets.len(),
            daemon_sets = namespace.daemon_sets.len(),
            services = namespace.services.len(),
            pvcs = namespace.pvcs.len(),
            config_maps = namespace.config_maps,
            secrets = namespace.secrets,
            "Namespace topology built"
        );
    }

    /// Log one list call
    pub fn log_listed(&self, namespace: &str, kind: ResourceKind, count: usize) {
        if !self.enabled {
            return;
        }
        debug!(
            event = "resources_listed",
            source = %self.source,
            namespace = %namespace,
            kind = %kind,
            count = count,
            "Listed resources"
        );
    }

    /// Log system-managed ConfigMaps/Secrets left out of the counts
    pub fn log_system_filtered(&self, namespace: &str, config_maps: usize, secrets: usize) {
        if !self.enabled || (config_maps == 0 && secrets == 0) {
            return;
        }
        debug!(
            event = "system_resources_filtered",
            source = %self.source,
            namespace = %namespace,
            config_maps = config_maps,
            secrets = secrets,
            "Filtered system-managed resources"
        );
    }

    /// Log a fixture document that could not be used
    pub fn log_document_skipped(&self, file: usize, document: usize, reason: &str) {
        if !self.enabled {
            return;
        }
        warn!(
            event = "document_skipped",
            source = %self.source,
            file = file,
            document = document,
            reason = %reason,
            "Skipping fixture document"
        );
    }

    /// Log a finished render
    pub fn log_rendered(&self, namespaces: usize, bytes: usize) {
        if !self.enabled {
            return;
        }
        info!(
            event = "diagram_rendered",
            source = %self.source,
            namespaces = namespaces,
            bytes = bytes,
            "D2 diagram rendered"
        );
    }

    /// Log one validator check
    pub fn log_check(&self, check: &str, failures: usize) {
        if !self.enabled {
            return;
        }
        if failures == 0 {
            info!(
                event = "validation_check",
                source = %self.source,
                check = %check,
                passed = true,
                "Validation check passed"
            );
        } else {
            warn!(
                event = "validation_check",
                source = %self.source,
                check = %check,
                passed = false,
                failures = failures,
                "Validation check failed"
            );
        }
    }
}
