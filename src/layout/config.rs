use serde::{Deserialize, Serialize};

use crate::graph::EdgeKind;

/// Live-adjustable simulation tunables.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub repulsion: f32,
    /// Pairs further apart than this skip repulsion entirely.
    pub repulsion_cutoff: f32,
    pub import_rest_length: f32,
    pub link_rest_length: f32,
    pub contains_rest_length: f32,
    pub spring: f32,
    pub damping: f32,
    pub centering: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: 2_000.0,
            repulsion_cutoff: 600.0,
            import_rest_length: 120.0,
            link_rest_length: 160.0,
            contains_rest_length: 40.0,
            spring: 0.02,
            damping: 0.82,
            centering: 0.0005,
        }
    }
}

impl LayoutConfig {
    pub const REPULSION_RANGE: (f32, f32) = (0.0, 20_000.0);
    pub const CUTOFF_RANGE: (f32, f32) = (50.0, 4_000.0);
    pub const REST_LENGTH_RANGE: (f32, f32) = (5.0, 600.0);
    pub const SPRING_RANGE: (f32, f32) = (0.0, 0.2);
    pub const DAMPING_RANGE: (f32, f32) = (0.1, 0.98);
    pub const CENTERING_RANGE: (f32, f32) = (0.0, 0.02);

    pub fn rest_length(&self, kind: EdgeKind) -> f32 {
        match kind {
            EdgeKind::Import => self.import_rest_length,
            EdgeKind::Link => self.link_rest_length,
            EdgeKind::Contains => self.contains_rest_length,
        }
    }

    pub fn set_rest_length(&mut self, kind: EdgeKind, length: f32) {
        match kind {
            EdgeKind::Import => self.import_rest_length = length,
            EdgeKind::Link => self.link_rest_length = length,
            EdgeKind::Contains => self.contains_rest_length = length,
        }
    }

    /// Clamps every tunable into its supported range. Values loaded from a
    /// settings file go through here before reaching the engine.
    pub fn clamped(self) -> Self {
        fn clamp(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
            if value.is_finite() {
                value.clamp(min, max)
            } else {
                fallback
            }
        }

        let defaults = Self::default();
        Self {
            repulsion: clamp(self.repulsion, Self::REPULSION_RANGE, defaults.repulsion),
            repulsion_cutoff: clamp(
                self.repulsion_cutoff,
                Self::CUTOFF_RANGE,
                defaults.repulsion_cutoff,
            ),
            import_rest_length: clamp(
                self.import_rest_length,
                Self::REST_LENGTH_RANGE,
                defaults.import_rest_length,
            ),
            link_rest_length: clamp(
                self.link_rest_length,
                Self::REST_LENGTH_RANGE,
                defaults.link_rest_length,
            ),
            contains_rest_length: clamp(
                self.contains_rest_length,
                Self::REST_LENGTH_RANGE,
                defaults.contains_rest_length,
            ),
            spring: clamp(self.spring, Self::SPRING_RANGE, defaults.spring),
            damping: clamp(self.damping, Self::DAMPING_RANGE, defaults.damping),
            centering: clamp(self.centering, Self::CENTERING_RANGE, defaults.centering),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_repairs_out_of_range_values() {
        let config = LayoutConfig {
            damping: 4.0,
            spring: f32::NAN,
            import_rest_length: -3.0,
            ..LayoutConfig::default()
        }
        .clamped();

        assert_eq!(config.damping, LayoutConfig::DAMPING_RANGE.1);
        assert_eq!(config.spring, LayoutConfig::default().spring);
        assert_eq!(config.import_rest_length, LayoutConfig::REST_LENGTH_RANGE.0);
    }

    #[test]
    fn rest_lengths_are_per_kind() {
        let mut config = LayoutConfig::default();
        config.set_rest_length(EdgeKind::Link, 42.0);
        assert_eq!(config.rest_length(EdgeKind::Link), 42.0);
        assert_eq!(config.rest_length(EdgeKind::Import), 120.0);
    }
}
