use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    SourceFile,
    MarkupFile,
    FunctionDeclaration,
    Other,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        Self::SourceFile,
        Self::MarkupFile,
        Self::FunctionDeclaration,
        Self::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::SourceFile => "Source file",
            Self::MarkupFile => "Markup file",
            Self::FunctionDeclaration => "Function",
            Self::Other => "Other",
        }
    }

    /// World-space radius before camera zoom is applied.
    pub fn radius(self) -> f32 {
        match self {
            Self::SourceFile => 7.0,
            Self::MarkupFile => 6.0,
            Self::FunctionDeclaration => 4.0,
            Self::Other => 5.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Import,
    Link,
    Contains,
}

impl EdgeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Link => "link",
            Self::Contains => "contains",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub node_type: NodeType,
    /// File this node was derived from. Empty for synthetic nodes.
    pub origin: PathBuf,
    /// Enclosing node, e.g. the file a function is declared in.
    pub parent: Option<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            origin: PathBuf::new(),
            parent: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl CodeGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn count_by_type(&self, node_type: NodeType) -> usize {
        self.nodes
            .iter()
            .filter(|node| node.node_type == node_type)
            .count()
    }

    /// Drops edges whose endpoints are missing from the node set, self loops
    /// and duplicate `(source, target, kind)` triples. Returns how many were
    /// removed.
    pub fn retain_valid_edges(&mut self) -> usize {
        let known = self
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<HashSet<_>>();
        let before = self.edges.len();
        let mut seen = HashSet::new();
        self.edges.retain(|edge| {
            edge.source != edge.target
                && known.contains(edge.source.as_str())
                && known.contains(edge.target.as_str())
                && seen.insert((edge.source.clone(), edge.target.clone(), edge.kind))
        });
        before - self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_valid_edges_drops_dangling_loops_and_duplicates() {
        let mut graph = CodeGraph {
            nodes: vec![
                GraphNode::new("a", "a", NodeType::SourceFile),
                GraphNode::new("b", "b", NodeType::SourceFile),
            ],
            edges: vec![
                GraphEdge::new("a", "b", EdgeKind::Import),
                GraphEdge::new("a", "b", EdgeKind::Import),
                GraphEdge::new("a", "b", EdgeKind::Link),
                GraphEdge::new("a", "missing", EdgeKind::Import),
                GraphEdge::new("b", "b", EdgeKind::Link),
            ],
        };

        assert_eq!(graph.retain_valid_edges(), 3);
        assert_eq!(
            graph.edges,
            vec![
                GraphEdge::new("a", "b", EdgeKind::Import),
                GraphEdge::new("a", "b", EdgeKind::Link),
            ]
        );
    }

    #[test]
    fn node_types_serialize_kebab_case() {
        let json = serde_json::to_string(&NodeType::FunctionDeclaration).unwrap();
        assert_eq!(json, "\"function-declaration\"");
    }
}
