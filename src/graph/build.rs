use std::collections::HashSet;

use tracing::debug;

use super::detect::{FileKind, SourceFile};
use super::model::{CodeGraph, EdgeKind, GraphEdge, GraphNode};
use super::resolve::{FileIndex, normalize_path};

/// Accumulates nodes and edges, deduplicating nodes by id (first insert
/// wins) and edges by `(source, target, kind)`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<GraphNode>,
    node_ids: HashSet<String>,
    edges: Vec<GraphEdge>,
    edge_keys: HashSet<(String, String, EdgeKind)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if !self.node_ids.insert(node.id.clone()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if edge.source == edge.target {
            return false;
        }
        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if !self.edge_keys.insert(key) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Finishes the graph, dropping edges whose endpoints never became
    /// nodes.
    pub fn build(self) -> CodeGraph {
        let mut graph = CodeGraph {
            nodes: self.nodes,
            edges: self.edges,
        };
        let dropped = graph.retain_valid_edges();
        if dropped > 0 {
            debug!("dropped {dropped} edges with unknown endpoints");
        }
        graph
    }
}

/// Builds the graph for a file set. Never fails: files without readable
/// contents still get their node, and references that do not resolve to a
/// known file are dropped.
pub fn build_graph(files: &[SourceFile]) -> CodeGraph {
    let mut ordered = files
        .iter()
        .map(|file| (normalize_path(&file.path), file.contents.as_deref()))
        .collect::<Vec<_>>();
    ordered.sort_by(|a, b| a.0.cmp(&b.0));
    ordered.dedup_by(|a, b| a.0 == b.0);

    let index = FileIndex::new(ordered.iter().map(|(path, _)| path.as_path()));
    let mut builder = GraphBuilder::new();

    for (path, contents) in &ordered {
        let detection = FileKind::from_path(path).detect(path, *contents, &index);
        for node in detection.nodes {
            builder.add_node(node);
        }
        for edge in detection.edges {
            builder.add_edge(edge);
        }
    }

    builder.build()
}
