use eframe::egui::{Pos2, Rect, Vec2};

pub const MIN_ZOOM: f32 = 0.05;
pub const MAX_ZOOM: f32 = 6.0;
const FIT_PADDING: f32 = 40.0;

/// Pan and zoom applied on top of the viewport center.
///
/// `screen = viewport.center() + pan + world * zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub pan: Vec2,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn world_to_screen(&self, viewport: Rect, world: Vec2) -> Pos2 {
        viewport.center() + self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, viewport: Rect, screen: Pos2) -> Vec2 {
        (screen - viewport.center() - self.pan) / self.zoom
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Scales by `factor` while keeping the world point under `cursor` fixed.
    pub fn zoom_at(&mut self, viewport: Rect, cursor: Pos2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let world_before = self.screen_to_world(viewport, cursor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = cursor - viewport.center() - (world_before * self.zoom);
    }

    pub fn wheel_factor(scroll: f32) -> f32 {
        (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15)
    }

    /// Centers `bounds` in the viewport at the largest zoom that fits.
    /// With nothing to fit, resets to the identity camera.
    pub fn fit(&mut self, viewport: Rect, bounds: Option<Rect>) {
        let Some(bounds) = bounds else {
            *self = Self::default();
            return;
        };
        if viewport.width() <= 0.0 || viewport.height() <= 0.0 {
            *self = Self::default();
            return;
        }

        let available = (viewport.size() - Vec2::splat(FIT_PADDING * 2.0)).max(Vec2::splat(1.0));
        let zoom = (available.x / bounds.width().max(1.0))
            .min(available.y / bounds.height().max(1.0))
            .clamp(MIN_ZOOM, MAX_ZOOM);

        self.zoom = zoom;
        self.pan = -bounds.center().to_vec2() * zoom;
    }
}
