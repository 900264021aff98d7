use eframe::egui::{self, Align, Context, Layout};

use crate::graph::NodeType;
use crate::layout::LayoutPhase;
use crate::settings::Settings;
use crate::view::{FrameLoop, GraphView};
use crate::workspace::LoadedGraph;

use super::super::{LoadStats, ViewModel};

impl ViewModel {
    pub(in crate::app) fn new(loaded: LoadedGraph, settings: &Settings) -> Self {
        let mut view = GraphView::new(settings.layout, settings.colors, settings.show_functions);
        let stats = LoadStats::from_loaded(&loaded);
        view.set_graph(loaded.graph);

        let mut frame_loop = FrameLoop::new();
        frame_loop.start();

        Self {
            view,
            frame_loop,
            root: loaded.root,
            stats,
            status: None,
            search: String::new(),
            label_zoom_threshold: settings.label_zoom_threshold,
            show_quadtree_overlay: settings.show_quadtree,
            quadtree_cells: Vec::new(),
            pointer_captured: false,
            needs_fit: true,
        }
    }

    /// Swaps in a rescanned graph; surviving nodes keep their layout.
    pub(in crate::app) fn replace_graph(&mut self, loaded: LoadedGraph) {
        self.stats = LoadStats::from_loaded(&loaded);
        if self.root != loaded.root {
            self.needs_fit = true;
        }
        self.root = loaded.root;
        self.status = None;
        self.view.set_graph(loaded.graph);
        self.frame_loop.start();
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("codegraph-view");
                    ui.separator();
                    ui.label(format!("root: {}", self.root.display()));
                    let graph = self.view.graph();
                    ui.label(format!(
                        "files: {}{}",
                        self.stats.files,
                        if self.stats.truncated { " (truncated)" } else { "" }
                    ));
                    ui.label(format!(
                        "functions: {}",
                        graph.count_by_type(NodeType::FunctionDeclaration)
                    ));
                    ui.label(format!("edges: {}", graph.edge_count()));
                    let rescan = ui.add_enabled(!is_loading, egui::Button::new("Rescan"));
                    if rescan.clicked() {
                        *reload_requested = true;
                    }
                    if is_loading {
                        ui.spinner();
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.layout_status_text());
                    });
                });
                if let Some(status) = &self.status {
                    ui.colored_label(egui::Color32::from_rgb(235, 120, 100), status.as_str());
                }
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| self.draw_controls(ui));
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn layout_status_text(&self) -> String {
        let engine = self.view.engine();
        let phase = match engine.phase() {
            LayoutPhase::Settling => "settling",
            LayoutPhase::Idle => "idle",
        };
        format!(
            "{} nodes  |  {phase} (alpha {:.3})  |  zoom {:.2}  |  scan {:.2?}, {} unreadable",
            engine.nodes().len(),
            engine.alpha(),
            self.view.camera().zoom,
            self.stats.elapsed,
            self.stats.unreadable,
        )
    }
}
