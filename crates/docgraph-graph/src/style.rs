//! Node and edge styling.
//!
//! Node colour and size are pure functions of the chapter level, independent of
//! layout state. Coarse chapters are large and dark; finer ones shrink and fade.

use crate::graph::NodeDisplay;
use serde::{Deserialize, Serialize};

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Fill colour per level, coarsest first. Levels past the end reuse the last entry.
const LEVEL_PALETTE: [Color; 5] = [
    Color::rgb(0x03, 0x04, 0x5e),
    Color::rgb(0x00, 0x77, 0xb6),
    Color::rgb(0x00, 0xb4, 0xd8),
    Color::rgb(0x48, 0xca, 0xe4),
    Color::rgb(0x90, 0xe0, 0xef),
];

/// Minimum zoom at which a level's labels appear, coarsest first.
const LABEL_MIN_ZOOM: [f32; 5] = [0.0, 0.5, 1.0, 1.6, 2.4];

pub const SESSION_COLOR: Color = Color::rgb(0xf7, 0x7f, 0x00);
pub const EDGE_COLOR: Color = Color::rgba(0x99, 0x99, 0x99, 0x99);

pub const BASE_NODE_RADIUS: f32 = 24.0;
pub const MIN_NODE_RADIUS: f32 = 8.0;
pub const SESSION_RADIUS: f32 = 7.0;
/// Zoom needed before session labels show.
pub const SESSION_LABEL_MIN_ZOOM: f32 = 1.6;
pub const EDGE_BASE_WIDTH: f32 = 2.0;

fn level_slot(level: u32) -> usize {
    (level.max(1) as usize - 1).min(LEVEL_PALETTE.len() - 1)
}

pub fn level_color(level: u32) -> Color {
    LEVEL_PALETTE[level_slot(level)]
}

/// Each level down is three quarters the radius of the one above.
pub fn level_radius(level: u32) -> f32 {
    let depth = level.max(1) - 1;
    (BASE_NODE_RADIUS * 0.75f32.powi(depth.min(16) as i32)).max(MIN_NODE_RADIUS)
}

pub fn label_min_zoom(level: u32) -> f32 {
    let slot = level.max(1) as usize - 1;
    match LABEL_MIN_ZOOM.get(slot) {
        Some(zoom) => *zoom,
        // Keep growing past the table so deeper levels never show earlier.
        None => LABEL_MIN_ZOOM[LABEL_MIN_ZOOM.len() - 1] + 0.8 * (slot + 1 - LABEL_MIN_ZOOM.len()) as f32,
    }
}

pub fn chapter_display(level: u32) -> NodeDisplay {
    NodeDisplay {
        radius: level_radius(level),
        color: level_color(level),
        label_min_zoom: label_min_zoom(level),
    }
}

pub fn session_display() -> NodeDisplay {
    NodeDisplay {
        radius: SESSION_RADIUS,
        color: SESSION_COLOR,
        label_min_zoom: SESSION_LABEL_MIN_ZOOM,
    }
}

pub fn edge_width(weight: f32) -> f32 {
    EDGE_BASE_WIDTH * weight.max(0.0).sqrt()
}

/// Label font sizing in graph units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    /// On-screen size at zoom 1.0.
    pub base_font_size: f32,
    /// Floor for the inverse-zoom scaling.
    pub min_font_size: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            base_font_size: 12.0,
            min_font_size: 4.0,
        }
    }
}

impl LabelStyle {
    /// Font size shrinks as the view zooms in so labels keep a steady on-screen size.
    pub fn font_size(&self, scale: f32) -> f32 {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        (self.base_font_size / scale).max(self.min_font_size)
    }
}

pub fn label_visible(display: &NodeDisplay, scale: f32) -> bool {
    scale >= display.label_min_zoom
}
