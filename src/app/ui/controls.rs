use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, Ui};

use crate::graph::{EdgeKind, NodeType};
use crate::layout::LayoutConfig;

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

#[derive(Clone, Copy, Default)]
struct SliderKeyHoldState {
    positive_secs: f32,
    negative_secs: f32,
}

fn slider_key_accel_multiplier(hold_secs: f32) -> f32 {
    let ramp = hold_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Held arrow keys nudge a focused slider, accelerating the longer they
/// are held.
fn apply_slider_arrow_acceleration(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    (min, max): (f32, f32),
) -> bool {
    let state_id = response.id.with("arrow_key_hold_state");
    let mut hold_state = ui.ctx().data(|data| {
        data.get_temp::<SliderKeyHoldState>(state_id)
            .unwrap_or_default()
    });

    if !response.has_focus() {
        ui.ctx()
            .data_mut(|data| data.insert_temp(state_id, SliderKeyHoldState::default()));
        return false;
    }

    let (delta_time, increase_down, decrease_down) = ui.input(|input| {
        (
            input.stable_dt.min(0.1),
            input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp),
            input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown),
        )
    });

    hold_state.positive_secs = if increase_down {
        hold_state.positive_secs + delta_time
    } else {
        0.0
    };
    hold_state.negative_secs = if decrease_down {
        hold_state.negative_secs + delta_time
    } else {
        0.0
    };
    ui.ctx()
        .data_mut(|data| data.insert_temp(state_id, hold_state));

    let direction = (increase_down as i8) - (decrease_down as i8);
    if direction == 0 {
        return false;
    }

    let hold_secs = if direction > 0 {
        hold_state.positive_secs
    } else {
        hold_state.negative_secs
    };
    let step = ((max - min) / 200.0).max(0.0005);
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold_secs);
    let old_value = *value;
    *value = (*value + direction as f32 * step * speed * delta_time).clamp(min, max);
    ui.ctx().request_repaint();
    (*value - old_value).abs() > f32::EPSILON
}

fn tuning_slider(ui: &mut Ui, value: &mut f32, range: (f32, f32), text: &str, hover: &str) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, RangeInclusive::new(range.0, range.1))
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if response.hovered() {
        response.request_focus();
    }
    let dragged = response.changed();
    dragged | apply_slider_arrow_acceleration(ui, &response, value, range)
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Filter (file name, function or path)")
            .on_hover_text("Dim nodes that do not fuzzy-match; the layout is unchanged.");
        if ui.text_edit_singleline(&mut self.search).changed() {
            self.view.set_filter(&self.search);
        }
        if self.view.filter().is_active() {
            let total = self.view.engine().nodes().len();
            let matching = (0..total).filter(|&index| !self.view.is_dimmed(index)).count();
            ui.small(format!("{matching} of {total} nodes match"));
        }

        ui.separator();

        let mut show_functions = self.view.show_functions();
        if ui
            .checkbox(&mut show_functions, "Show function nodes")
            .on_hover_text("Include one node per top-level function declaration.")
            .changed()
        {
            self.view.set_show_functions(show_functions);
        }

        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the partitions used to find nearby node pairs.");

        ui.add(
            egui::Slider::new(&mut self.label_zoom_threshold, 0.1..=4.0)
                .text("Label zoom")
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text("Draw every label once zoomed in past this level.");

        ui.horizontal(|ui| {
            if ui.button("Fit to view").clicked() {
                self.view.fit();
            }
            if ui
                .button("Reheat")
                .on_hover_text("Restart the layout from full temperature.")
                .clicked()
            {
                self.view.engine_mut().reheat();
            }
        });

        ui.separator();

        egui::CollapsingHeader::new("Node colors")
            .default_open(true)
            .show(ui, |ui| {
                for node_type in NodeType::ALL {
                    ui.horizontal(|ui| {
                        let mut color = self.view.colors().get(node_type);
                        if egui::color_picker::color_edit_button_srgb(ui, &mut color).changed() {
                            self.view.set_type_color(node_type, color);
                        }
                        ui.label(node_type.label());
                    });
                }
            });

        egui::CollapsingHeader::new("Layout tuning")
            .default_open(true)
            .show(ui, |ui| {
                let mut config = *self.view.engine().config();
                if draw_layout_sliders(ui, &mut config) {
                    self.view.set_layout_config(config);
                }
                if ui.button("Reset to defaults").clicked() {
                    self.view.set_layout_config(LayoutConfig::default());
                }
            });
    }
}

fn draw_layout_sliders(ui: &mut Ui, config: &mut LayoutConfig) -> bool {
    let mut changed = false;
    changed |= tuning_slider(
        ui,
        &mut config.repulsion,
        LayoutConfig::REPULSION_RANGE,
        "Repulsion",
        "How strongly every pair of nearby nodes pushes apart.",
    );
    changed |= tuning_slider(
        ui,
        &mut config.repulsion_cutoff,
        LayoutConfig::CUTOFF_RANGE,
        "Repulsion cutoff",
        "Pairs further apart than this ignore each other.",
    );

    for (kind, text) in [
        (EdgeKind::Import, "Import length"),
        (EdgeKind::Link, "Link length"),
        (EdgeKind::Contains, "Contains length"),
    ] {
        let mut length = config.rest_length(kind);
        if tuning_slider(
            ui,
            &mut length,
            LayoutConfig::REST_LENGTH_RANGE,
            text,
            "Rest length of the spring along this edge kind.",
        ) {
            config.set_rest_length(kind, length);
            changed = true;
        }
    }

    changed |= tuning_slider(
        ui,
        &mut config.spring,
        LayoutConfig::SPRING_RANGE,
        "Spring",
        "How strongly edges pull toward their rest length.",
    );
    changed |= tuning_slider(
        ui,
        &mut config.damping,
        LayoutConfig::DAMPING_RANGE,
        "Damping",
        "Fraction of velocity kept each tick.",
    );
    changed |= tuning_slider(
        ui,
        &mut config.centering,
        LayoutConfig::CENTERING_RANGE,
        "Centering",
        "Pull of every node toward the origin.",
    );
    changed
}
