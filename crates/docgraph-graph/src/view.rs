use crate::graph::Vec2;
use docgraph_core::ContainerSize;
use serde::{Deserialize, Serialize};

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleExtent {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleExtent {
    fn default() -> Self {
        Self { min: 0.02, max: 8.0 }
    }
}

impl ScaleExtent {
    pub fn clamp(&self, scale: f32) -> f32 {
        if !scale.is_finite() {
            return self.min.max(f32::MIN_POSITIVE);
        }
        scale.clamp(self.min, self.max)
    }
}

/// Axis-aligned bounds in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(
            Self {
                min: first,
                max: first,
            },
            |acc, p| Self {
                min: Vec2::new(acc.min.x.min(p.x), acc.min.y.min(p.y)),
                max: Vec2::new(acc.max.x.max(p.x), acc.max.y.max(p.y)),
            },
        ))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn expand(&self, margin: f32) -> Self {
        Self {
            min: Vec2::new(self.min.x - margin, self.min.y - margin),
            max: Vec2::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

/// Pan/zoom state: `screen = graph * scale + translate`.
///
/// Independent of the simulation; it only changes where the rendered group is
/// drawn and which labels are legible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub fn identity() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }

    pub fn new(translate_x: f32, translate_y: f32, scale: f32) -> Self {
        Self {
            translate_x,
            translate_y,
            scale,
        }
    }

    pub fn apply(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            point.x * self.scale + self.translate_x,
            point.y * self.scale + self.translate_y,
        )
    }

    pub fn invert(&self, point: Vec2) -> Vec2 {
        Vec2::new(
            (point.x - self.translate_x) / self.scale,
            (point.y - self.translate_y) / self.scale,
        )
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.translate_x += dx;
            self.translate_y += dy;
        }
    }

    /// Multiply the scale by `factor`, keeping the graph point under `pivot`
    /// (screen space) fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, pivot: Vec2, extent: ScaleExtent) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.set_scale_at(self.scale * factor, pivot, extent);
    }

    pub fn set_scale_at(&mut self, scale: f32, pivot: Vec2, extent: ScaleExtent) {
        let anchor = self.invert(pivot);
        self.scale = extent.clamp(scale);
        self.translate_x = pivot.x - anchor.x * self.scale;
        self.translate_y = pivot.y - anchor.y * self.scale;
    }

    /// Transform that fits `bounds` inside `viewport` with `padding` pixels to spare.
    pub fn zoom_to_fit(
        bounds: Bounds,
        viewport: ContainerSize,
        padding: f32,
        extent: ScaleExtent,
    ) -> Self {
        let avail_w = (viewport.width - 2.0 * padding).max(1.0);
        let avail_h = (viewport.height - 2.0 * padding).max(1.0);
        let scale = if bounds.width() <= f32::EPSILON && bounds.height() <= f32::EPSILON {
            1.0
        } else {
            (avail_w / bounds.width().max(f32::EPSILON))
                .min(avail_h / bounds.height().max(f32::EPSILON))
        };
        let scale = extent.clamp(scale);
        let center = bounds.center();
        let (cx, cy) = viewport.center();
        Self {
            translate_x: cx - center.x * scale,
            translate_y: cy - center.y * scale,
            scale,
        }
    }
}
