// Diagram generation
//
// Renders detected flow edges as Mermaid flowcharts.

use crate::analysis::{Architecture, ComponentKind, FlowEdge, RelationKind};
use crate::parser::short_name;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Diagram generator for creating Mermaid diagrams
pub struct DiagramGenerator {
    /// Maximum nodes to display before collapsing to kind level
    max_nodes: usize,
    /// Layout direction (TB, LR, BT, RL)
    direction: String,
    /// Include facade, view and redirect edges
    include_incidental: bool,
}

impl DiagramGenerator {
    pub fn new() -> Self {
        Self {
            max_nodes: 100,
            direction: "TB".to_string(),
            include_incidental: false,
        }
    }

    /// Set maximum nodes before aggregation
    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max;
        self
    }

    /// Set layout direction
    pub fn with_direction(mut self, dir: &str) -> Self {
        self.direction = dir.to_string();
        self
    }

    pub fn with_incidental(mut self, include: bool) -> Self {
        self.include_incidental = include;
        self
    }

    fn keeps(&self, edge: &FlowEdge) -> bool {
        self.include_incidental
            || !matches!(
                edge.relation,
                RelationKind::UsesFacade | RelationKind::RendersView | RelationKind::RedirectsTo
            )
    }

    /// Flowchart of every collaboration edge, `None` when there are none
    pub fn generate_flow_graph(&self, architecture: &Architecture) -> Option<String> {
        let edges: Vec<FlowEdge> = architecture.edges().into_iter().filter(|e| self.keeps(e)).collect();
        if edges.is_empty() {
            return None;
        }

        let mut nodes: BTreeSet<&str> = BTreeSet::new();
        for edge in &edges {
            nodes.insert(edge.source.as_str());
            nodes.insert(edge.target.as_str());
        }
        if nodes.len() > self.max_nodes {
            return Some(self.generate_kind_level_graph(architecture, &edges));
        }

        let kinds = kind_index(architecture);
        let mut lines = vec![format!("graph {}", self.direction)];
        for node in &nodes {
            let style = kinds.get(node).map(|k| node_style(*k)).unwrap_or("");
            lines.push(format!("    {}[\"{}\"]{}", sanitize_id(node), label(node), style));
        }

        let mut seen: HashSet<(&str, &str, RelationKind)> = HashSet::new();
        for edge in &edges {
            if !seen.insert((edge.source.as_str(), edge.target.as_str(), edge.relation)) {
                continue;
            }
            let arrow = match edge.is_async {
                Some(true) => "-.->",
                _ => "-->",
            };
            lines.push(format!(
                "    {} {}|{}| {}",
                sanitize_id(&edge.source),
                arrow,
                edge.relation.as_str(),
                sanitize_id(&edge.target)
            ));
        }

        Some(lines.join("\n"))
    }

    /// Aggregated view: one node per kind, edges counted
    pub fn generate_kind_level_graph(&self, architecture: &Architecture, edges: &[FlowEdge]) -> String {
        let kinds = kind_index(architecture);
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
        for edge in edges {
            let from = kinds.get(edge.source.as_str()).map(|k| k.label()).unwrap_or("Other");
            let to = kinds.get(edge.target.as_str()).map(|k| k.label()).unwrap_or("Other");
            if from != to {
                *counts.entry((from.to_string(), to.to_string())).or_default() += 1;
            }
        }

        let mut lines = vec![format!("graph {}", self.direction)];
        for result in architecture.non_empty() {
            lines.push(format!(
                "    {}[\"{} ({})\"]",
                sanitize_id(result.kind.label()),
                result.kind.label(),
                result.count
            ));
        }
        if counts.keys().any(|(from, to)| from == "Other" || to == "Other") {
            lines.push("    Other[\"Other\"]".to_string());
        }
        for ((from, to), count) in counts {
            lines.push(format!("    {} -->|{}| {}", sanitize_id(&from), count, sanitize_id(&to)));
        }
        lines.join("\n")
    }
}

impl Default for DiagramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_index(architecture: &Architecture) -> BTreeMap<&str, ComponentKind> {
    architecture
        .all_components()
        .map(|c| (c.fq_name.as_str(), c.kind))
        .collect()
}

fn label(node: &str) -> String {
    short_name(node).replace('"', "'")
}

/// Class suffix based on the component kind
fn node_style(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Route | ComponentKind::Controller => ":::http",
        ComponentKind::Model => ":::model",
        ComponentKind::Job | ComponentKind::Listener => ":::queue",
        ComponentKind::Event | ComponentKind::Notification => ":::event",
        _ => "",
    }
}

/// Sanitize a string for use as a Mermaid node ID
fn sanitize_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ArchitectureMetadata, Component, FlowReport, JobDispatch, Metadata, ScanResult};

    fn architecture() -> Architecture {
        let mut controller = Component::degraded(
            ComponentKind::Controller,
            "App\\Http\\Controllers\\OrderController",
            String::new(),
            "",
        );
        controller.metadata = Metadata::Controller(Default::default());
        controller.flow = Some(FlowReport {
            jobs: vec![JobDispatch {
                job: "App\\Jobs\\ShipOrder".to_string(),
                is_async: true,
            }],
            events: vec!["App\\Events\\OrderPlaced".to_string()],
            views: vec!["orders.show".to_string()],
            ..Default::default()
        });
        let job = Component::degraded(ComponentKind::Job, "App\\Jobs\\ShipOrder", String::new(), "");

        Architecture::new(
            ArchitectureMetadata::new("Shop", "/srv/shop"),
            vec![
                ScanResult::new(ComponentKind::Controller, vec![controller]),
                ScanResult::new(ComponentKind::Job, vec![job]),
            ],
        )
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("App\\Models\\User"), "App_Models_User");
        assert_eq!(sanitize_id("GET api/users"), "GET_api_users");
        assert_eq!(sanitize_id("MyClass"), "MyClass");
    }

    #[test]
    fn test_diagram_generator_new() {
        let gen = DiagramGenerator::new();
        assert_eq!(gen.max_nodes, 100);
        assert_eq!(gen.direction, "TB");
    }

    #[test]
    fn test_with_direction() {
        let gen = DiagramGenerator::new().with_direction("LR").with_max_nodes(50);
        assert_eq!(gen.direction, "LR");
        assert_eq!(gen.max_nodes, 50);
    }

    #[test]
    fn test_flow_graph() {
        let graph = DiagramGenerator::new().generate_flow_graph(&architecture()).unwrap();
        assert!(graph.starts_with("graph TB"));
        assert!(graph.contains("App_Http_Controllers_OrderController[\"OrderController\"]:::http"));
        assert!(graph.contains("App_Http_Controllers_OrderController -.->|dispatches-job| App_Jobs_ShipOrder"));
        assert!(graph.contains("-->|fires-event| App_Events_OrderPlaced"));
        assert!(!graph.contains("renders-view"));
    }

    #[test]
    fn test_incidental_edges_opt_in() {
        let graph = DiagramGenerator::new()
            .with_incidental(true)
            .generate_flow_graph(&architecture())
            .unwrap();
        assert!(graph.contains("renders-view"));
    }

    #[test]
    fn test_kind_level_when_too_many_nodes() {
        let graph = DiagramGenerator::new()
            .with_max_nodes(2)
            .generate_flow_graph(&architecture())
            .unwrap();
        assert!(graph.contains("Controllers[\"Controllers (1)\"]"));
        assert!(graph.contains("Controllers -->|1| Jobs"));
        assert!(graph.contains("Controllers -->|1| Other"));
    }

    #[test]
    fn test_no_edges_no_graph() {
        let arch = Architecture::new(ArchitectureMetadata::new("Empty", "/"), Vec::new());
        assert!(DiagramGenerator::new().generate_flow_graph(&arch).is_none());
    }
}
