use serde::Serialize;
use tracing::trace;

use crate::config::ViewportConfig;
use crate::geometry::{Bounds, Point};

/// Optional clamp applied to every scale change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl ScaleLimits {
    fn normalized(min: f32, max: f32) -> Option<Self> {
        let usable = |bound: f32| (bound.is_finite() && bound > 0.0).then_some(bound);
        let (min, max) = match (usable(min), usable(max)) {
            (None, None) => {
                trace!(min, max, "ignoring scale limits");
                return None;
            }
            (Some(a), Some(b)) => (a.min(b), a.max(b)),
            (Some(min), None) => (min, f32::INFINITY),
            (None, Some(max)) => (0.0, max),
        };
        Some(Self { min, max })
    }
}

/// Pan and zoom state of the canvas.
///
/// `screen = offset + world * scale`. Independent of the tree: the renderer
/// applies this transform to whatever the layout produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportController {
    scale: f32,
    offset: Point,
    limits: Option<ScaleLimits>,
    zoom_step: f32,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            offset: Point::ORIGIN,
            limits: None,
            zoom_step: ViewportConfig::default().zoom_step,
        }
    }

    /// Controller clamped to the configured scale range.
    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new()
            .with_limits(config.min_scale, config.max_scale)
            .with_zoom_step(config.zoom_step)
    }

    /// Clamp future scale changes to `min..=max`. Swapped bounds are put in
    /// order; a non-finite or non-positive bound leaves that side open.
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.limits = ScaleLimits::normalized(min, max);
        self.scale = self.clamp(self.scale);
        self
    }

    pub fn with_zoom_step(mut self, step: f32) -> Self {
        if step.is_finite() && step > 1.0 {
            self.zoom_step = step;
        }
        self
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn limits(&self) -> Option<ScaleLimits> {
        self.limits
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        self.offset + world * self.scale
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        (screen - self.offset) / self.scale
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset = self.offset + Point::new(dx, dy);
    }

    pub fn set_offset(&mut self, offset: Point) {
        self.offset = offset;
    }

    /// Multiply the scale by `factor`, keeping the world point under
    /// `pointer` fixed on screen. Non-positive or non-finite factors are
    /// ignored.
    pub fn zoom_at(&mut self, pointer: Point, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            trace!(factor, "ignoring zoom factor");
            return;
        }
        self.set_scale_at(pointer, self.scale * factor);
    }

    pub fn zoom_in_at(&mut self, pointer: Point) {
        self.zoom_at(pointer, self.zoom_step);
    }

    pub fn zoom_out_at(&mut self, pointer: Point) {
        self.zoom_at(pointer, 1.0 / self.zoom_step);
    }

    pub fn set_scale_at(&mut self, pointer: Point, scale: f32) {
        if !(scale.is_finite() && scale > 0.0) {
            trace!(scale, "ignoring scale");
            return;
        }
        let anchor = self.screen_to_world(pointer);
        self.scale = self.clamp(scale);
        self.offset = pointer - anchor * self.scale;
    }

    /// Scale and center `bounds` inside a `width × height` screen area,
    /// leaving `padding` on every side.
    pub fn fit_bounds(&mut self, bounds: Bounds, width: f32, height: f32, padding: f32) {
        let avail_w = (width - 2.0 * padding).max(1.0);
        let avail_h = (height - 2.0 * padding).max(1.0);
        let content_w = bounds.width().max(1.0);
        let content_h = bounds.height().max(1.0);
        self.scale = self.clamp((avail_w / content_w).min(avail_h / content_h));
        let screen_center = Point::new(width / 2.0, height / 2.0);
        self.offset = screen_center - bounds.center() * self.scale;
    }

    pub fn reset(&mut self) {
        self.scale = self.clamp(1.0);
        self.offset = Point::ORIGIN;
    }

    fn clamp(&self, scale: f32) -> f32 {
        match self.limits {
            Some(limits) => scale.clamp(limits.min, limits.max),
            None => scale,
        }
    }
}
