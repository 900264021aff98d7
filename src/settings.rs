use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::Color32;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::graph::NodeType;
use crate::layout::LayoutConfig;
use crate::view::ViewEvent;
use crate::workspace::ScanOptions;

/// Fill color per node type, stored as plain RGB so the settings file
/// stays readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeColors {
    pub source_file: [u8; 3],
    pub markup_file: [u8; 3],
    pub function_declaration: [u8; 3],
    pub other: [u8; 3],
}

impl Default for TypeColors {
    fn default() -> Self {
        Self {
            source_file: [86, 156, 214],
            markup_file: [106, 190, 120],
            function_declaration: [226, 172, 84],
            other: [150, 156, 168],
        }
    }
}

impl TypeColors {
    pub fn get(&self, node_type: NodeType) -> [u8; 3] {
        match node_type {
            NodeType::SourceFile => self.source_file,
            NodeType::MarkupFile => self.markup_file,
            NodeType::FunctionDeclaration => self.function_declaration,
            NodeType::Other => self.other,
        }
    }

    pub fn set(&mut self, node_type: NodeType, color: [u8; 3]) -> bool {
        let slot = match node_type {
            NodeType::SourceFile => &mut self.source_file,
            NodeType::MarkupFile => &mut self.markup_file,
            NodeType::FunctionDeclaration => &mut self.function_declaration,
            NodeType::Other => &mut self.other,
        };
        if *slot == color {
            return false;
        }
        *slot = color;
        true
    }

    pub fn color32(&self, node_type: NodeType) -> Color32 {
        let [r, g, b] = self.get(node_type);
        Color32::from_rgb(r, g, b)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutConfig,
    pub colors: TypeColors,
    pub show_functions: bool,
    /// Labels are drawn for every node once the camera zoom reaches this.
    pub label_zoom_threshold: f32,
    pub show_quadtree: bool,
    pub scan: ScanOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            colors: TypeColors::default(),
            show_functions: true,
            label_zoom_threshold: 0.8,
            show_quadtree: false,
            scan: ScanOptions::default(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        settings.layout = settings.layout.clamped();
        if !settings.label_zoom_threshold.is_finite() {
            settings.label_zoom_threshold = Self::default().label_zoom_threshold;
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write settings file {}", path.display()))
    }

    /// Folds a persisted view event into the settings. Returns whether
    /// anything changed and the file should be rewritten.
    pub fn apply_event(&mut self, event: &ViewEvent) -> bool {
        match event {
            ViewEvent::FunctionNodesToggled(show) => {
                let changed = self.show_functions != *show;
                self.show_functions = *show;
                changed
            }
            ViewEvent::TypeColorChanged { node_type, color } => {
                self.colors.set(*node_type, *color)
            }
            ViewEvent::NodeActivated { .. } | ViewEvent::SelectionCleared => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.show_functions = false;
        settings.layout.spring = 0.05;
        settings.colors.set(NodeType::Other, [9, 8, 7]);
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "layout": { "damping": 7.0 }, "show_functions": false }"#).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(!loaded.show_functions);
        assert_eq!(loaded.layout.damping, LayoutConfig::DAMPING_RANGE.1);
        assert_eq!(loaded.layout.spring, LayoutConfig::default().spring);
        assert_eq!(loaded.colors, TypeColors::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let error = Settings::load(&path).unwrap_err();
        assert!(format!("{error:#}").contains("failed to parse settings file"));
    }

    #[test]
    fn persisted_events_update_settings() {
        let mut settings = Settings::default();
        assert!(settings.apply_event(&ViewEvent::FunctionNodesToggled(false)));
        assert!(!settings.show_functions);
        assert!(settings.apply_event(&ViewEvent::TypeColorChanged {
            node_type: NodeType::SourceFile,
            color: [1, 1, 1],
        }));
        assert_eq!(settings.colors.get(NodeType::SourceFile), [1, 1, 1]);
        assert!(!settings.apply_event(&ViewEvent::SelectionCleared));
    }
}
