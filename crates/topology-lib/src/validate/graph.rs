//! Structured reader for rendered diagrams
//!
//! Understands the subset of D2 the renderer emits: root attributes,
//! top-level containers, one level of nodes inside them, and `a -> b`
//! edges with optional quoted labels. Anything deeper (style maps) is
//! skipped. Reading never fails; malformed input simply yields fewer
//! entries.

use std::collections::{BTreeMap, HashSet};

const EDGE_ARROW: &str = " -> ";
const STYLE_KEY: &str = "style";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramGraph {
    /// Root `key: value` pairs such as `direction` or `grid-columns`
    pub attributes: BTreeMap<String, String>,
    pub containers: Vec<Container>,
    /// Edges declared outside any container
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub label: Option<String>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: Option<String>,
    pub shape: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

impl DiagramGraph {
    pub fn parse(text: &str) -> Self {
        let mut graph = DiagramGraph::default();
        // keys of the currently open blocks
        let mut open: Vec<String> = Vec::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line == "}" {
                open.pop();
                continue;
            }

            if let Some(key) = line.strip_suffix('{') {
                let key = key.trim_end().trim_end_matches(':').trim_end().to_string();
                match open.len() {
                    0 if !key.is_empty() => graph.containers.push(Container {
                        id: key.clone(),
                        ..Default::default()
                    }),
                    1 if key != STYLE_KEY => {
                        if let Some(container) = graph.containers.last_mut() {
                            container.nodes.push(Node {
                                id: key.clone(),
                                ..Default::default()
                            });
                        }
                    }
                    _ => {}
                }
                open.push(key);
                continue;
            }

            if let Some(edge) = parse_edge(line) {
                match (open.len(), graph.containers.last_mut()) {
                    (0, _) => graph.edges.push(edge),
                    (1, Some(container)) => container.edges.push(edge),
                    _ => {}
                }
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = unquote(value.trim());

            match open.len() {
                0 => {
                    graph.attributes.insert(key.to_string(), value);
                }
                1 => {
                    if let Some(container) = graph.containers.last_mut() {
                        if key == "label" {
                            container.label = Some(value);
                        }
                    }
                }
                2 if open[1] != STYLE_KEY => {
                    let node = graph
                        .containers
                        .last_mut()
                        .and_then(|container| container.nodes.last_mut());
                    if let Some(node) = node {
                        match key {
                            "label" => node.label = Some(value),
                            "shape" => node.shape = Some(value),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        graph
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    /// Container keys declared more than once, in first-seen order
    pub fn duplicate_containers(&self) -> Vec<&str> {
        duplicates(self.containers.iter().map(|c| c.id.as_str()))
    }
}

impl Container {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    /// Node keys declared more than once, in first-seen order. D2 merges
    /// these into a single node.
    pub fn duplicate_nodes(&self) -> Vec<&str> {
        duplicates(self.nodes.iter().map(|n| n.id.as_str()))
    }
}

fn duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for id in ids {
        if !seen.insert(id) && !repeated.contains(&id) {
            repeated.push(id);
        }
    }
    repeated
}

/// `a -> b` or `a -> b: "label"`
fn parse_edge(line: &str) -> Option<Edge> {
    let (head, label) = match line.split_once(": ") {
        Some((head, label)) if head.contains(EDGE_ARROW) => (head, Some(unquote(label.trim()))),
        Some(_) => return None,
        None => (line, None),
    };
    let (from, to) = head.split_once(EDGE_ARROW)?;

    Some(Edge {
        from: from.trim().to_string(),
        to: to.trim().to_string(),
        label,
    })
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(|v| v.replace("\\\"", "\""))
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGRAM: &str = r##"direction: right

grid-columns: 1
grid-rows: 1

# row 1
demo: {
  label: "demo"
  style: {
    fill: "#f5f7fa"
  }
  web: {
    label: "● web (3)"
    shape: rectangle
  }
  svc_web: {
    label: "web"
    shape: hexagon
  }

  svc_web -> web
  web -> pvc_data: "/data (rw)\n/backup (ro)"
}
"##;

    #[test]
    fn test_parse_rendered_diagram() {
        let graph = DiagramGraph::parse(DIAGRAM);

        assert_eq!(graph.attribute("direction"), Some("right"));
        assert_eq!(graph.attribute("grid-columns"), Some("1"));
        assert_eq!(graph.containers.len(), 1);

        let demo = graph.container("demo").unwrap();
        assert_eq!(demo.label.as_deref(), Some("demo"));
        // the style map is not a node
        assert_eq!(demo.nodes.len(), 2);
        assert_eq!(demo.node("web").unwrap().label.as_deref(), Some("● web (3)"));
        assert_eq!(demo.node("svc_web").unwrap().shape.as_deref(), Some("hexagon"));

        assert_eq!(demo.edge("svc_web", "web").unwrap().label, None);
        assert_eq!(
            demo.edge("web", "pvc_data").unwrap().label.as_deref(),
            Some("/data (rw)\\n/backup (ro)")
        );
    }

    #[test]
    fn test_parse_edge() {
        assert_eq!(
            parse_edge("a -> b"),
            Some(Edge {
                from: "a".to_string(),
                to: "b".to_string(),
                label: None
            })
        );
        assert_eq!(parse_edge("label: \"a -> b\""), None);
        assert_eq!(parse_edge("shape: page"), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"say \\\"hi\\\"\""), "say \"hi\"");
        assert_eq!(unquote("rectangle"), "rectangle");
    }

    #[test]
    fn test_duplicate_keys() {
        let text = "a: {\n  x: {\n  }\n  y: {\n  }\n  x: {\n  }\n}\nb: {\n}\na: {\n}\n";
        let graph = DiagramGraph::parse(text);

        assert_eq!(graph.duplicate_containers(), vec!["a"]);
        assert_eq!(graph.containers[0].duplicate_nodes(), vec!["x"]);
        assert!(graph.containers[1].duplicate_nodes().is_empty());
    }

    #[test]
    fn test_parse_tolerates_garbage() {
        let graph = DiagramGraph::parse("}\n}\nnot a diagram\n{");
        assert!(graph.containers.is_empty());
    }
}
