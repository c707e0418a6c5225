//! D2 diagram rendering
//!
//! Output layout:
//!
//! ```text
//! direction: right
//!
//! grid-columns: 2
//! grid-rows: 1
//!
//! # row 1
//! shop: {
//!   label: "shop"
//!   ...
//!   web: {
//!     label: "● web (3)"
//!     shape: rectangle
//!   }
//!   svc_web_svc -> web
//! }
//! ```
//!
//! Rendering is a pure function of the model: the same `Cluster` always
//! yields byte-identical text.

mod grid;

pub use self::grid::GridLayout;

use crate::error::Result;
use crate::model::{Cluster, Namespace, Pvc, Workload};
use crate::naming::{config_label, namespace_ids, workload_label, NodeIds};
use crate::relationships::{service_to_workload_edges, workload_to_volume_edges, Connection};
use std::collections::HashSet;
use std::io::Write;

/// Header directive every diagram starts with
pub const DIRECTION_HEADER: &str = "direction: right";
pub const DEFAULT_GRID_COLUMNS: usize = 3;

const INDENT: &str = "  ";
const NAMESPACE_FILL: &str = "#f5f7fa";
const NAMESPACE_STROKE: &str = "#4a6fa5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Namespace containers per grid row; 0 stacks them vertically
    pub grid_columns: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            grid_columns: DEFAULT_GRID_COLUMNS,
        }
    }
}

/// Render `cluster` as D2 into `writer`
pub fn render<W: Write>(cluster: &Cluster, options: &RenderOptions, writer: &mut W) -> Result<()> {
    writer.write_all(render_to_string(cluster, options).as_bytes())?;
    writer.flush()?;
    Ok(())
}

pub fn render_to_string(cluster: &Cluster, options: &RenderOptions) -> String {
    let mut diagram = D2Writer::default();
    diagram.line(DIRECTION_HEADER);

    let grid = GridLayout::pack(cluster.namespaces.len(), options.grid_columns);
    if !grid.is_empty() {
        diagram.blank();
        diagram.line(format!("grid-columns: {}", grid.columns));
        diagram.line(format!("grid-rows: {}", grid.rows));
    }

    let keys = namespace_ids(cluster);
    for (index, (namespace, key)) in cluster.namespaces.iter().zip(&keys).enumerate() {
        let (row, column) = grid.position(index);
        diagram.blank();
        if column == 0 {
            diagram.line(format!("# row {}", row + 1));
        }
        render_namespace(&mut diagram, namespace, key);
    }

    diagram.finish()
}

fn render_namespace(diagram: &mut D2Writer, namespace: &Namespace, key: &str) {
    let ids = NodeIds::for_namespace(namespace);

    diagram.open(key);
    diagram.line(format!("label: {}", quote(&namespace.name)));
    diagram.open("style");
    diagram.line(format!("fill: {}", quote(NAMESPACE_FILL)));
    diagram.line(format!("stroke: {}", quote(NAMESPACE_STROKE)));
    diagram.close();

    for workload in namespace.workloads() {
        render_workload(diagram, &ids.workload(workload), workload);
    }

    for service in &namespace.services {
        diagram.open(&ids.service(&service.name));
        diagram.line(format!("label: {}", quote(&service.name)));
        diagram.line("shape: hexagon");
        diagram.close();
    }

    for pvc in &namespace.pvcs {
        render_pvc(diagram, &ids.claim(&pvc.name), pvc);
    }

    if namespace.has_config() {
        diagram.open(ids.config());
        diagram.line(format!(
            "label: {}",
            quote(&config_label(namespace.config_maps, namespace.secrets))
        ));
        diagram.line("shape: page");
        diagram.close();
    }

    let service_edges = service_to_workload_edges(namespace);
    let volume_edges = workload_to_volume_edges(namespace);

    // Claims only known through a mount (StatefulSet templates, storage not
    // listed) still get a cylinder instead of D2's default box.
    let mut declared: HashSet<&str> = namespace.pvcs.iter().map(|pvc| pvc.name.as_str()).collect();
    for workload in namespace.workloads() {
        for mount in &workload.volume_mounts {
            if declared.insert(mount.claim_name.as_str()) {
                diagram.open(&ids.claim(&mount.claim_name));
                diagram.line(format!("label: {}", quote(&mount.claim_name)));
                diagram.line("shape: cylinder");
                diagram.close();
            }
        }
    }

    if !service_edges.is_empty() || !volume_edges.is_empty() {
        diagram.blank();
    }
    for edge in service_edges.iter().chain(volume_edges.iter()) {
        render_edge(diagram, edge);
    }

    diagram.close();
}

fn render_workload(diagram: &mut D2Writer, key: &str, workload: &Workload) {
    diagram.open(key);
    diagram.line(format!(
        "label: {}",
        quote(&workload_label(&workload.name, workload.kind, workload.replicas))
    ));
    diagram.line("shape: rectangle");
    diagram.close();
}

fn render_pvc(diagram: &mut D2Writer, key: &str, pvc: &Pvc) {
    diagram.open(key);
    diagram.line(format!("label: {}", quote(&pvc.name)));
    diagram.line("shape: cylinder");
    if let Some(tooltip) = pvc_tooltip(pvc) {
        diagram.line(format!("tooltip: {}", quote(&tooltip)));
    }
    diagram.close();
}

fn pvc_tooltip(pvc: &Pvc) -> Option<String> {
    let parts: Vec<String> = [("class", &pvc.storage_class), ("capacity", &pvc.capacity)]
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

fn render_edge(diagram: &mut D2Writer, edge: &Connection) {
    match &edge.label {
        Some(label) => diagram.line(format!("{}: {}", edge.edge(), quote(label))),
        None => diagram.line(edge.edge()),
    }
}

/// Double-quoted D2 string. Only `"` is escaped so that `\n` line-break
/// markers inside labels survive.
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\\\""))
}

/// Indentation-aware line buffer
#[derive(Debug, Default)]
struct D2Writer {
    out: String,
    depth: usize,
}

impl D2Writer {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, key: &str) {
        self.line(format!("{}: {{", key));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}
