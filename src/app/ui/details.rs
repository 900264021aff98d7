use std::path::Path;

use eframe::egui::{self, RichText, Ui};
use tracing::warn;

use crate::graph::EdgeKind;
use crate::util::display_path;

use super::super::{ViewModel, open_in_editor};

struct RelatedNode {
    id: String,
    label: String,
    relation: &'static str,
}

fn relation(kind: EdgeKind, outgoing: bool) -> &'static str {
    match (kind, outgoing) {
        (EdgeKind::Import, true) => "imports",
        (EdgeKind::Import, false) => "imported by",
        (EdgeKind::Link, true) => "links to",
        (EdgeKind::Link, false) => "linked from",
        (EdgeKind::Contains, true) => "declares",
        (EdgeKind::Contains, false) => "declared in",
    }
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(node) = self.view.selected_node() else {
            ui.label("Click a node to select it.");
            return;
        };

        let label = node.label.clone();
        let node_type = node.node_type;
        let origin = node.origin.clone();
        let parent = node.parent.clone();
        let related = self.related_nodes();

        ui.label(RichText::new(label).strong());
        ui.small(display_path(&origin, &self.root).into_owned());
        ui.add_space(6.0);
        ui.label(format!("Type: {}", node_type.label()));
        if let Some(parent) = &parent {
            ui.label(format!("Declared in: {}", display_path(Path::new(parent), &self.root)));
        }

        if ui.button("Open file").clicked()
            && let Err(error) = open_in_editor(&origin)
        {
            warn!("{error:#}");
        }

        ui.separator();
        ui.label(RichText::new(format!("Connections ({})", related.len())).strong());

        let mut select = None;
        egui::ScrollArea::vertical()
            .id_salt("related_nodes_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, related.len(), |ui, row_range| {
                for entry in &related[row_range] {
                    ui.horizontal(|ui| {
                        ui.small(entry.relation);
                        if ui.selectable_label(false, entry.label.as_str()).clicked() {
                            select = Some(entry.id.clone());
                        }
                    });
                }
            });

        if let Some(id) = select {
            self.view.select(Some(id));
        }
    }

    fn related_nodes(&self) -> Vec<RelatedNode> {
        let engine = self.view.engine();
        let Some(selected) = self.view.selected().and_then(|id| engine.index_of(id)) else {
            return Vec::new();
        };

        let mut related = engine
            .edges()
            .iter()
            .filter_map(|edge| {
                let (other, outgoing) = if edge.source == selected {
                    (edge.target, true)
                } else if edge.target == selected {
                    (edge.source, false)
                } else {
                    return None;
                };
                let node = engine.node(other)?;
                Some(RelatedNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    relation: relation(edge.kind, outgoing),
                })
            })
            .collect::<Vec<_>>();
        related.sort_by(|a, b| a.relation.cmp(b.relation).then_with(|| a.label.cmp(&b.label)));
        related
    }
}
