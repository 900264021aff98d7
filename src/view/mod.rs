
mod camera;
mod filter;
mod frame;

use std::collections::HashSet;
use std::path::PathBuf;

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::debug;

pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM};
pub use filter::{NodeFilter, edge_dimmed};
pub use frame::{FrameLoop, FrameOutcome, LoopState};

use crate::graph::{CodeGraph, NodeType};
use crate::layout::{KICK_ALPHA, LayoutConfig, LayoutEngine, SimEdge, SimNode};
use crate::settings::TypeColors;

/// Extra screen-space reach of a node's hit circle.
pub const HIT_SLOP: f32 = 4.0;
/// Pointer travel below this many pixels between down and up is a click.
pub const CLICK_SLOP: f32 = 4.0;

#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    NodeActivated { id: String, origin: PathBuf },
    SelectionCleared,
    FunctionNodesToggled(bool),
    TypeColorChanged { node_type: NodeType, color: [u8; 3] },
}

#[derive(Clone, Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    Pan {
        last: Pos2,
        travel: f32,
    },
    DragNode {
        id: String,
        last: Pos2,
        travel: f32,
    },
}

#[derive(Debug)]
pub struct GraphView {
    graph: CodeGraph,
    engine: LayoutEngine,
    camera: Camera,
    viewport: Rect,
    filter: NodeFilter,
    dimmed: Vec<bool>,
    show_functions: bool,
    colors: TypeColors,
    selected: Option<String>,
    neighbors: HashSet<usize>,
    hovered: Option<usize>,
    gesture: Gesture,
    events: Vec<ViewEvent>,
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), TypeColors::default(), true)
    }
}

impl GraphView {
    pub fn new(layout: LayoutConfig, colors: TypeColors, show_functions: bool) -> Self {
        Self {
            graph: CodeGraph::default(),
            engine: LayoutEngine::new(layout),
            camera: Camera::default(),
            viewport: Rect::ZERO,
            filter: NodeFilter::default(),
            dimmed: Vec::new(),
            show_functions,
            colors,
            selected: None,
            neighbors: HashSet::new(),
            hovered: None,
            gesture: Gesture::Idle,
            events: Vec::new(),
        }
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LayoutEngine {
        &mut self.engine
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn colors(&self) -> &TypeColors {
        &self.colors
    }

    pub fn show_functions(&self) -> bool {
        self.show_functions
    }

    pub fn filter(&self) -> &NodeFilter {
        &self.filter
    }

    /// Replaces the full graph. Nodes that survive keep their layout state.
    pub fn set_graph(&mut self, graph: CodeGraph) {
        self.graph = graph;
        self.rebuild_visible();
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn step(&mut self) -> bool {
        self.engine.tick()
    }

    fn rebuild_visible(&mut self) {
        let show_functions = self.show_functions;
        let nodes = self
            .graph
            .nodes
            .iter()
            .filter(|node| show_functions || node.node_type != NodeType::FunctionDeclaration);
        self.engine.set_topology(nodes, &self.graph.edges);

        self.filter.compute(self.engine.nodes(), &mut self.dimmed);
        self.hovered = None;

        if let Some(id) = &self.selected
            && self.engine.index_of(id).is_none()
        {
            self.selected = None;
        }
        self.refresh_neighbors();

        if let Gesture::DragNode { id, .. } = &self.gesture
            && self.engine.index_of(id).is_none()
        {
            self.gesture = Gesture::Idle;
        }
    }

    fn refresh_neighbors(&mut self) {
        self.neighbors.clear();
        let Some(selected) = self.selected.as_deref().and_then(|id| self.engine.index_of(id))
        else {
            return;
        };
        for edge in self.engine.edges() {
            if edge.source == selected {
                self.neighbors.insert(edge.target);
            } else if edge.target == selected {
                self.neighbors.insert(edge.source);
            }
        }
    }

    pub fn hit_test(&self, screen: Pos2) -> Option<usize> {
        let world = self.camera.screen_to_world(self.viewport, screen);
        let zoom = self.camera.zoom;
        self.engine
            .nodes()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, node)| {
                let reach = (node.radius * zoom) + HIT_SLOP;
                ((node.position - world) * zoom).length_sq() <= reach * reach
            })
            .map(|(index, _)| index)
    }

    pub fn on_pointer_down(&mut self, screen: Pos2) {
        match self.hit_test(screen) {
            Some(index) => {
                self.engine.pin(index);
                self.engine.kick(KICK_ALPHA);
                let id = self.engine.nodes()[index].id.clone();
                self.gesture = Gesture::DragNode {
                    id,
                    last: screen,
                    travel: 0.0,
                };
                self.hovered = Some(index);
            }
            None => {
                self.gesture = Gesture::Pan {
                    last: screen,
                    travel: 0.0,
                };
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen: Pos2) {
        if matches!(self.gesture, Gesture::Idle) {
            self.hovered = self.hit_test(screen);
            return;
        }
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Pan { last, travel } => {
                let delta = screen - *last;
                *travel += delta.length();
                *last = screen;
                self.camera.pan_by(delta);
            }
            Gesture::DragNode { id, last, travel } => {
                *travel += (screen - *last).length();
                *last = screen;
                if let Some(index) = self.engine.index_of(id) {
                    let world = self.camera.screen_to_world(self.viewport, screen);
                    self.engine.set_position(index, world);
                    self.engine.kick(KICK_ALPHA);
                    self.hovered = Some(index);
                }
            }
        }
    }

    /// Ends the current gesture. Short travel counts as a click: on a node
    /// it selects and activates it, on empty space it clears the selection.
    pub fn on_pointer_up(&mut self, screen: Pos2) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Pan { last, travel } => {
                let delta = screen - last;
                self.camera.pan_by(delta);
                if travel + delta.length() < CLICK_SLOP {
                    self.select(None);
                    self.events.push(ViewEvent::SelectionCleared);
                }
            }
            Gesture::DragNode { id, last, travel } => {
                let Some(index) = self.engine.index_of(&id) else {
                    return;
                };
                self.engine.unpin(index);
                if travel + (screen - last).length() < CLICK_SLOP {
                    let origin = self.engine.nodes()[index].origin.clone();
                    self.select(Some(id.clone()));
                    debug!("node activated: {id}");
                    self.events.push(ViewEvent::NodeActivated { id, origin });
                }
            }
        }
    }

    pub fn on_pointer_leave(&mut self) {
        if matches!(self.gesture, Gesture::Idle) {
            self.hovered = None;
        }
    }

    pub fn on_wheel(&mut self, cursor: Pos2, scroll: f32) {
        if scroll.abs() <= f32::EPSILON {
            return;
        }
        self.camera
            .zoom_at(self.viewport, cursor, Camera::wheel_factor(scroll));
    }

    /// Trackpad pinch and ctrl+scroll arrive as a multiplicative factor.
    pub fn on_pinch(&mut self, cursor: Pos2, factor: f32) {
        if (factor - 1.0).abs() <= f32::EPSILON {
            return;
        }
        self.camera.zoom_at(self.viewport, cursor, factor);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.camera.pan_by(delta);
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::DragNode { .. })
    }

    pub fn set_filter(&mut self, query: &str) {
        if self.filter.set_query(query) {
            self.filter.compute(self.engine.nodes(), &mut self.dimmed);
        }
    }

    pub fn is_dimmed(&self, index: usize) -> bool {
        self.dimmed.get(index).copied().unwrap_or(false)
    }

    pub fn is_edge_dimmed(&self, edge: &SimEdge) -> bool {
        edge_dimmed(&self.dimmed, edge)
    }

    pub fn set_show_functions(&mut self, show: bool) {
        if self.show_functions == show {
            return;
        }
        self.show_functions = show;
        self.rebuild_visible();
        self.events.push(ViewEvent::FunctionNodesToggled(show));
    }

    pub fn set_type_color(&mut self, node_type: NodeType, color: [u8; 3]) {
        if self.colors.set(node_type, color) {
            self.events
                .push(ViewEvent::TypeColorChanged { node_type, color });
        }
    }

    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        self.engine.set_config(config);
    }

    pub fn fit(&mut self) {
        self.camera.fit(self.viewport, self.engine.bounds());
    }

    /// Selects a node by id; unknown ids clear the selection.
    pub fn select(&mut self, id: Option<String>) {
        self.selected = id.filter(|id| self.engine.index_of(id).is_some());
        self.refresh_neighbors();
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_node(&self) -> Option<&SimNode> {
        let index = self.engine.index_of(self.selected.as_deref()?)?;
        self.engine.node(index)
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected_node_index() == Some(index)
    }

    pub fn is_neighbor(&self, index: usize) -> bool {
        self.neighbors.contains(&index)
    }

    pub fn is_edge_highlighted(&self, edge: &SimEdge) -> bool {
        let Some(selected) = self.selected_node_index() else {
            return false;
        };
        edge.source == selected || edge.target == selected
    }

    fn selected_node_index(&self) -> Option<usize> {
        self.engine.index_of(self.selected.as_deref()?)
    }

    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}
