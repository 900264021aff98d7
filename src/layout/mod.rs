mod config;
mod forces;
mod quadtree;

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use std::path::PathBuf;

use eframe::egui::{Rect, Vec2, pos2, vec2};
use tracing::debug;

use crate::graph::{EdgeKind, GraphEdge, GraphNode, NodeType};
pub use config::LayoutConfig;
use forces::{apply_repulsion, apply_springs, integrate};
use quadtree::QuadNode;
pub use quadtree::QuadtreeCell;

pub const MIN_ALPHA: f32 = 0.001;
pub const ALPHA_DECAY: f32 = 0.994;
/// Alpha floor applied by drags and tunable changes.
pub const KICK_ALPHA: f32 = 0.3;
/// Spawn circle radius per `sqrt(node_count)`.
pub const SPAWN_RADIUS: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutPhase {
    Idle,
    Settling,
}

#[derive(Clone, Debug)]
pub struct SimNode {
    pub id: String,
    pub label: String,
    pub node_type: NodeType,
    pub origin: PathBuf,
    pub parent: Option<String>,
    pub radius: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub pinned: bool,
}

impl SimNode {
    fn from_graph_node(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            label: node.label.clone(),
            node_type: node.node_type,
            origin: node.origin.clone(),
            parent: node.parent.clone(),
            radius: node.node_type.radius(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pinned: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimEdge {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
}

#[derive(Debug, Default)]
pub struct SimulationState {
    nodes: Vec<SimNode>,
    edges: Vec<SimEdge>,
    index_by_id: HashMap<String, usize>,
    alpha: f32,
    positions: Vec<Vec2>,
}

#[derive(Debug, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
    state: SimulationState,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config: config.clamped(),
            state: SimulationState::default(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replaces the tunables; any change re-kicks the simulation so the
    /// layout visibly responds. Returns whether anything changed.
    pub fn set_config(&mut self, config: LayoutConfig) -> bool {
        let config = config.clamped();
        if config == self.config {
            return false;
        }
        self.config = config;
        self.kick(KICK_ALPHA);
        true
    }

    pub fn alpha(&self) -> f32 {
        self.state.alpha
    }

    pub fn phase(&self) -> LayoutPhase {
        if self.state.alpha > MIN_ALPHA {
            LayoutPhase::Settling
        } else {
            LayoutPhase::Idle
        }
    }

    pub fn is_settling(&self) -> bool {
        self.phase() == LayoutPhase::Settling
    }

    pub fn kick(&mut self, value: f32) {
        self.state.alpha = self.state.alpha.max(value.clamp(0.0, 1.0));
    }

    pub fn reheat(&mut self) {
        self.state.alpha = 1.0;
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.state.nodes
    }

    pub fn edges(&self) -> &[SimEdge] {
        &self.state.edges
    }

    pub fn node(&self, index: usize) -> Option<&SimNode> {
        self.state.nodes.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.state.index_by_id.get(id).copied()
    }

    /// Replaces the simulated node and edge sets.
    pub fn set_topology<'a>(
        &mut self,
        nodes: impl IntoIterator<Item = &'a GraphNode>,
        edges: impl IntoIterator<Item = &'a GraphEdge>,
    ) {
        let mut prior = std::mem::take(&mut self.state.nodes)
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut next_nodes: Vec<SimNode> = Vec::new();
        let mut fresh = Vec::new();
        let mut index_by_id = HashMap::new();
        for node in nodes {
            if index_by_id.contains_key(&node.id) {
                continue;
            }
            index_by_id.insert(node.id.clone(), next_nodes.len());
            let mut sim = SimNode::from_graph_node(node);
            let previous = prior.remove(&node.id);
            fresh.push(previous.is_none());
            if let Some(previous) = previous {
                sim.position = previous.position;
                sim.velocity = previous.velocity;
                sim.pinned = previous.pinned;
            }
            next_nodes.push(sim);
        }

        let node_count = next_nodes.len();
        let spawn_radius = SPAWN_RADIUS * (node_count as f32).sqrt();
        let mut spawned = 0usize;
        for (index, node) in next_nodes.iter_mut().enumerate() {
            if !fresh[index] {
                continue;
            }
            let angle = (index as f32 / node_count as f32) * TAU;
            node.position = vec2(angle.cos(), angle.sin()) * spawn_radius;
            spawned += 1;
        }

        let mut seen = HashSet::new();
        let mut next_edges = Vec::new();
        let mut dropped = 0usize;
        for edge in edges {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
            else {
                dropped += 1;
                continue;
            };
            if source == target || !seen.insert((source, target, edge.kind)) {
                dropped += 1;
                continue;
            }
            next_edges.push(SimEdge {
                source,
                target,
                kind: edge.kind,
            });
        }

        debug!(
            "layout topology: {} nodes ({spawned} spawned), {} edges, {dropped} edges dropped",
            next_nodes.len(),
            next_edges.len(),
        );

        self.state.nodes = next_nodes;
        self.state.edges = next_edges;
        self.state.index_by_id = index_by_id;
        self.reheat();
    }

    /// Advances the simulation by one step. Returns `false` without touching
    /// any state once alpha has reached the floor.
    pub fn tick(&mut self) -> bool {
        if !self.is_settling() {
            return false;
        }

        let alpha = self.state.alpha;
        let config = self.config;
        let state = &mut self.state;

        state.positions.clear();
        state
            .positions
            .extend(state.nodes.iter().map(|node| node.position));

        apply_repulsion(
            &mut state.nodes,
            &state.positions,
            config.repulsion,
            config.repulsion_cutoff,
            alpha,
        );
        apply_springs(
            &mut state.nodes,
            &state.positions,
            &state.edges,
            config.spring,
            |edge| config.rest_length(edge.kind),
            alpha,
        );
        integrate(&mut state.nodes, config.centering, config.damping, alpha);

        state.alpha *= ALPHA_DECAY;
        if state.alpha <= MIN_ALPHA {
            debug!("layout settled");
        }
        true
    }

    pub fn settle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    pub fn pin(&mut self, index: usize) -> bool {
        let Some(node) = self.state.nodes.get_mut(index) else {
            return false;
        };
        node.pinned = true;
        node.velocity = Vec2::ZERO;
        true
    }

    pub fn unpin(&mut self, index: usize) {
        if let Some(node) = self.state.nodes.get_mut(index) {
            node.pinned = false;
        }
    }

    pub fn set_position(&mut self, index: usize, position: Vec2) {
        if let Some(node) = self.state.nodes.get_mut(index) {
            node.position = position;
            node.velocity = Vec2::ZERO;
        }
    }

    pub fn bounds(&self) -> Option<Rect> {
        let mut nodes = self.state.nodes.iter();
        let first = nodes.next()?;
        let mut rect = Rect::from_center_size(
            pos2(first.position.x, first.position.y),
            Vec2::splat(first.radius * 2.0),
        );
        for node in nodes {
            rect = rect.union(Rect::from_center_size(
                pos2(node.position.x, node.position.y),
                Vec2::splat(node.radius * 2.0),
            ));
        }
        Some(rect)
    }

    pub fn quadtree_cells(&mut self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        self.state.positions.clear();
        self.state
            .positions
            .extend(self.state.nodes.iter().map(|node| node.position));
        if let Some(tree) = QuadNode::build(&self.state.positions) {
            tree.collect_cells(0, cells);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_NODES: [GraphNode; 0] = [];
    const NO_EDGES: [GraphEdge; 0] = [];

    fn file(id: &str) -> GraphNode {
        GraphNode::new(id, id, NodeType::SourceFile)
    }

    fn distance(engine: &LayoutEngine, a: &str, b: &str) -> f32 {
        let a = engine.node(engine.index_of(a).unwrap()).unwrap().position;
        let b = engine.node(engine.index_of(b).unwrap()).unwrap().position;
        (a - b).length()
    }

    #[test]
    fn alpha_decay_terminates_within_predicted_ticks() {
        let nodes = [file("a"), file("b"), file("c")];
        let mut engine = LayoutEngine::default();
        engine.set_topology(&nodes, &NO_EDGES);
        assert_eq!(engine.alpha(), 1.0);

        let ticks = engine.settle(10_000);
        assert!((1140..=1150).contains(&ticks), "settled after {ticks} ticks");
        assert_eq!(engine.phase(), LayoutPhase::Idle);

        let before = engine.nodes().iter().map(|n| n.position).collect::<Vec<_>>();
        assert!(!engine.tick());
        let after = engine.nodes().iter().map(|n| n.position).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn two_connected_nodes_settle_near_rest_length() {
        let nodes = [file("a"), file("b")];
        let edges = [GraphEdge::new("a", "b", EdgeKind::Import)];
        let mut engine = LayoutEngine::default();
        engine.set_topology(&nodes, &edges);

        engine.settle(10_000);

        let rest = engine.config().import_rest_length;
        let d = distance(&engine, "a", "b");
        assert!((d - rest).abs() <= rest * 0.2, "distance {d} vs rest {rest}");
    }

    #[test]
    fn pinned_nodes_never_move() {
        let nodes = [file("a"), file("b"), file("c")];
        let edges = [
            GraphEdge::new("a", "b", EdgeKind::Import),
            GraphEdge::new("a", "c", EdgeKind::Link),
        ];
        let mut engine = LayoutEngine::new(LayoutConfig {
            repulsion: 20_000.0,
            ..LayoutConfig::default()
        });
        engine.set_topology(&nodes, &edges);

        let pinned = engine.index_of("a").unwrap();
        engine.set_position(pinned, vec2(3.0, 4.0));
        engine.pin(pinned);
        for _ in 0..500 {
            engine.tick();
        }
        assert_eq!(engine.node(pinned).unwrap().position, vec2(3.0, 4.0));

        engine.unpin(pinned);
        engine.kick(1.0);
        engine.tick();
        assert_ne!(engine.node(pinned).unwrap().position, vec2(3.0, 4.0));
    }

    #[test]
    fn topology_rebuild_preserves_positions_and_spawns_new_nodes_on_circle() {
        let mut engine = LayoutEngine::default();
        let first = [file("A"), file("B")];
        let edges = [GraphEdge::new("A", "B", EdgeKind::Import)];
        engine.set_topology(&first, &edges);
        engine.settle(2_000);
        let a = engine.node(engine.index_of("A").unwrap()).unwrap().position;
        let b = engine.node(engine.index_of("B").unwrap()).unwrap().position;

        let second = [file("A"), file("B"), file("C")];
        engine.set_topology(&second, &edges);

        assert_eq!(engine.node(engine.index_of("A").unwrap()).unwrap().position, a);
        assert_eq!(engine.node(engine.index_of("B").unwrap()).unwrap().position, b);

        let c = engine.node(engine.index_of("C").unwrap()).unwrap().position;
        let angle = (2.0 / 3.0) * TAU;
        let expected = vec2(angle.cos(), angle.sin()) * SPAWN_RADIUS * 3.0_f32.sqrt();
        assert!((c - expected).length() < 1e-3);
        assert_eq!(engine.alpha(), 1.0);
    }

    #[test]
    fn invalid_edges_are_filtered_before_simulation() {
        let nodes = [file("a"), file("b")];
        let edges = [
            GraphEdge::new("a", "ghost", EdgeKind::Import),
            GraphEdge::new("a", "a", EdgeKind::Import),
            GraphEdge::new("a", "b", EdgeKind::Link),
            GraphEdge::new("a", "b", EdgeKind::Link),
        ];
        let mut engine = LayoutEngine::default();
        engine.set_topology(&nodes, &edges);
        assert_eq!(engine.edges().len(), 1);
        assert_eq!(engine.edges()[0].kind, EdgeKind::Link);
    }

    #[test]
    fn coincident_nodes_separate_without_nan() {
        let nodes = [file("a"), file("b")];
        let mut engine = LayoutEngine::default();
        engine.set_topology(&nodes, &NO_EDGES);
        engine.set_position(0, Vec2::ZERO);
        engine.set_position(1, Vec2::ZERO);

        engine.tick();

        let a = engine.node(0).unwrap().position;
        let b = engine.node(1).unwrap().position;
        assert!(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite());
        assert!((a - b).length() > 0.0);
    }

    #[test]
    fn config_changes_kick_alpha() {
        let mut engine = LayoutEngine::default();
        engine.set_topology(&[file("a")], &NO_EDGES);
        engine.settle(10_000);
        assert!(!engine.is_settling());

        assert!(!engine.set_config(*engine.config()));
        let config = LayoutConfig {
            spring: 0.05,
            ..*engine.config()
        };
        assert!(engine.set_config(config));
        assert_eq!(engine.alpha(), KICK_ALPHA);
        assert!(engine.is_settling());
    }

    #[test]
    fn independent_engines_do_not_share_state() {
        let mut left = LayoutEngine::default();
        let mut right = LayoutEngine::default();
        left.set_topology(&[file("a"), file("b")], &NO_EDGES);
        left.settle(10);
        assert!(right.nodes().is_empty());
        assert_eq!(right.alpha(), 0.0);
        assert!(!right.tick());
        right.set_topology(&[file("z")], &NO_EDGES);
        assert_eq!(left.nodes().len(), 2);
    }

    #[test]
    fn empty_engine_has_no_bounds() {
        let mut engine = LayoutEngine::default();
        engine.set_topology(&NO_NODES, &NO_EDGES);
        assert!(engine.bounds().is_none());
        engine.settle(10);
    }
}
