//! The layout oracle consumed by the auto-fit engine.
//!
//! Every method may force a layout pass in a real renderer, so the engine
//! calls them sparingly: one box measurement and one probe per search, then
//! one overflow query per candidate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::surface::{BoxSize, Surface};

/// Styling variable holding the committed font scale.
pub const FONT_SIZE_VAR: &str = "font-size";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("surface is not attached to a layout box")]
    Detached,

    #[error("layout box {width}x{height} has no usable area")]
    DegenerateBox { width: f64, height: f64 },

    #[error("glyph probe measured a zero or non-finite aspect ratio")]
    DegenerateGlyph,
}

/// Bounding box of a run of text laid out on one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
}

pub trait LayoutOracle: Send + Sync {
    /// Pixel box of the surface.
    fn measure_box(&self, surface: &Surface) -> Result<BoxSize, LayoutError>;

    /// Box of `text` rendered unwrapped in the surface's current font.
    fn measure_text(&self, surface: &Surface, text: &str) -> Result<TextMetrics, LayoutError>;

    /// Line height divided by font size.
    fn relative_line_height(&self, surface: &Surface) -> Result<f64, LayoutError>;

    /// Whether the surface's content overflows its box on either axis.
    fn is_overflowing(&self, surface: &Surface) -> Result<bool, LayoutError>;

    /// Records a new viewport size. Oracles that read the viewport from a
    /// live renderer can ignore it.
    fn resize_viewport(&mut self, _viewport: BoxSize) {}

    /// Applies a candidate font scale, in percent of the viewport height.
    fn apply_candidate_size(&self, surface: &mut Surface, scale: f64) {
        surface.set_var(FONT_SIZE_VAR, format!("{scale}vh"));
    }
}
