use eframe::egui::{
    self, Align2, Color32, FontId, Painter, PointerButton, Pos2, Rect, Sense, Stroke, Ui, Vec2,
    vec2,
};

use crate::graph::EdgeKind;
use crate::util::display_path;
use crate::view::Camera;

use super::{IDLE_REPAINT, ViewModel};

const BACKGROUND: Color32 = Color32::from_rgb(19, 23, 29);
const HOVER_COLOR: Color32 = Color32::from_rgb(255, 164, 101);
const SELECTED_COLOR: Color32 = Color32::from_rgb(245, 206, 93);
const NEIGHBOR_COLOR: Color32 = Color32::from_rgb(246, 137, 92);

fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| ((a as f32 * (1.0 - amount)) + (b as f32 * amount)) as u8;
    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

fn edge_color(kind: EdgeKind) -> Color32 {
    match kind {
        EdgeKind::Import => Color32::from_rgba_unmultiplied(110, 140, 176, 190),
        EdgeKind::Link => Color32::from_rgba_unmultiplied(112, 176, 120, 190),
        EdgeKind::Contains => Color32::from_rgba_unmultiplied(96, 96, 108, 150),
    }
}

fn draw_background(painter: &Painter, rect: Rect, camera: &Camera) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (56.0 * camera.zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + camera.pan;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }
    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

/// Cheap cull: the segment's bounding box, padded, must touch `rect`.
fn segment_may_be_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    Rect::from_two_pos(start, end).expand(padding).intersects(rect)
}

impl ViewModel {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.view.set_viewport(rect);
        if self.needs_fit && rect.width() > 0.0 && rect.height() > 0.0 {
            self.view.fit();
            self.needs_fit = false;
        }

        self.handle_pointer(ui, &response);

        let outcome = self.frame_loop.frame(&mut self.view);
        if outcome.reschedule {
            if outcome.simulated || self.pointer_captured {
                ui.ctx().request_repaint();
            } else {
                ui.ctx().request_repaint_after(IDLE_REPAINT);
            }
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.view.camera());
        if self.show_quadtree_overlay {
            self.draw_quadtree_overlay(&painter, rect);
        }
        self.draw_edges(&painter, rect);
        self.draw_nodes(ui, &painter, rect);
        self.draw_hover_readout(&painter, rect);

        if self.view.is_dragging() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grabbing);
        } else if self.view.hovered().is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }
    }

    /// Feeds primary-button input to the view. Secondary and middle drags
    /// always pan.
    fn handle_pointer(&mut self, ui: &Ui, response: &egui::Response) {
        let (pointer, pressed, released, scroll, pinch) = ui.input(|input| {
            (
                input.pointer.latest_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
                input.raw_scroll_delta.y,
                input.zoom_delta(),
            )
        });

        if response.dragged_by(PointerButton::Secondary)
            || response.dragged_by(PointerButton::Middle)
        {
            self.view.pan_by(response.drag_delta());
        }

        let Some(pointer) = pointer else {
            self.view.on_pointer_leave();
            return;
        };

        if pressed && response.hovered() {
            self.view.on_pointer_down(pointer);
            self.pointer_captured = true;
        } else if self.pointer_captured || response.hovered() {
            self.view.on_pointer_move(pointer);
        } else {
            self.view.on_pointer_leave();
        }

        if released && self.pointer_captured {
            self.view.on_pointer_up(pointer);
            self.pointer_captured = false;
        }

        if response.hovered() {
            // ctrl+scroll is reported both ways; the zoom delta wins.
            if (pinch - 1.0).abs() > f32::EPSILON {
                self.view.on_pinch(pointer, pinch);
            } else {
                self.view.on_wheel(pointer, scroll);
            }
        }
    }

    fn draw_quadtree_overlay(&mut self, painter: &Painter, rect: Rect) {
        self.view
            .engine_mut()
            .quadtree_cells(&mut self.quadtree_cells);
        let camera = *self.view.camera();

        for cell in &self.quadtree_cells {
            let extent = Vec2::splat(cell.half_extent);
            let min = camera.world_to_screen(rect, cell.center - extent);
            let max = camera.world_to_screen(rect, cell.center + extent);
            let alpha = if cell.is_leaf { 110 } else { 55 };
            let width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
            painter.rect_stroke(
                Rect::from_min_max(min, max),
                0.0,
                Stroke::new(width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
                egui::StrokeKind::Middle,
            );
        }
    }

    fn draw_edges(&self, painter: &Painter, rect: Rect) {
        let engine = self.view.engine();
        let camera = self.view.camera();
        let selection_active = self.view.selected().is_some();
        let zoom_sqrt = camera.zoom.sqrt();

        for edge in engine.edges() {
            let (Some(source), Some(target)) = (engine.node(edge.source), engine.node(edge.target))
            else {
                continue;
            };
            let start = camera.world_to_screen(rect, source.position);
            let end = camera.world_to_screen(rect, target.position);
            if !segment_may_be_visible(rect, start, end, 2.5) {
                continue;
            }

            let (width, color) = if self.view.is_edge_highlighted(edge) {
                ((2.4 * zoom_sqrt).clamp(1.2, 4.4), NEIGHBOR_COLOR)
            } else if selection_active {
                ((0.8 * zoom_sqrt).clamp(0.45, 2.0), dim_color(edge_color(edge.kind), 0.55))
            } else {
                ((1.1 * zoom_sqrt).clamp(0.6, 3.4), edge_color(edge.kind))
            };
            let color = if self.view.is_edge_dimmed(edge) {
                dim_color(color, 0.25)
            } else {
                color
            };

            painter.line_segment([start, end], Stroke::new(width, color));
        }
    }

    fn draw_nodes(&self, ui: &Ui, painter: &Painter, rect: Rect) {
        let engine = self.view.engine();
        let camera = self.view.camera();
        let colors = self.view.colors();
        let selection_active = self.view.selected().is_some();
        let show_all_labels = camera.zoom >= self.label_zoom_threshold;
        let mut selection_animating = false;

        for (index, node) in engine.nodes().iter().enumerate() {
            let position = camera.world_to_screen(rect, node.position);
            let radius = (node.radius * camera.zoom).max(1.5);
            if !rect.expand(radius + 80.0).contains(position) {
                continue;
            }

            let is_selected = self.view.is_selected(index);
            let is_hovered = self.view.hovered() == Some(index);
            let is_neighbor = self.view.is_neighbor(index);
            let is_dimmed = self.view.is_dimmed(index);

            let base = colors.color32(node.node_type);
            let mut color = if is_hovered {
                HOVER_COLOR
            } else if is_neighbor {
                blend_color(base, NEIGHBOR_COLOR, 0.55)
            } else if selection_active && !is_selected {
                dim_color(base, 0.52)
            } else {
                base
            };
            if is_dimmed {
                color = dim_color(color, 0.25);
            }

            let selection_mix = ui
                .ctx()
                .animate_bool(ui.make_persistent_id(("node-selection", node.id.as_str())), is_selected);
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }
            let color = blend_color(color, SELECTED_COLOR, selection_mix);

            painter.circle_filled(position, radius, color);
            if selection_mix > 0.0 {
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + selection_mix,
                        Color32::from_rgba_unmultiplied(245, 206, 93, (60.0 + selection_mix * 120.0) as u8),
                    ),
                );
            }
            let outline = if is_hovered {
                Stroke::new(1.8, Color32::from_gray(240))
            } else {
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
            };
            painter.circle_stroke(position, radius, outline);

            let draw_label = is_selected
                || is_hovered
                || ((show_all_labels || is_neighbor) && !is_dimmed);
            if draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    node.label.as_str(),
                    FontId::proportional(12.0),
                    if is_dimmed {
                        Color32::from_gray(130)
                    } else {
                        Color32::from_gray(238)
                    },
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }
    }

    fn draw_hover_readout(&self, painter: &Painter, rect: Rect) {
        let Some(node) = self.view.hovered().and_then(|index| self.view.engine().node(index))
        else {
            return;
        };
        painter.text(
            rect.left_top() + vec2(10.0, 10.0),
            Align2::LEFT_TOP,
            format!(
                "{}  |  {}  |  {}",
                node.label,
                node.node_type.label(),
                display_path(&node.origin, &self.root)
            ),
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
    }
}
