//! Headless layout oracle backed by the static font-metric tables.
//!
//! Text is wrapped greedily per paragraph at the box width. The surface
//! overflows vertically when `lines × line_height × font_px` exceeds the box
//! height, and horizontally when a single word is wider than the box (words
//! never break, matching `overflow-wrap: normal`).

use crate::fit::metrics::{get_metrics, FontFamily, FontMetricTable};
use crate::fit::oracle::{LayoutError, LayoutOracle, TextMetrics, FONT_SIZE_VAR};
use crate::render::surface::{BoxSize, Surface};

pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;
/// Font size of a surface with no `font-size` variable.
pub const BASE_FONT_PX: f64 = 16.0;
/// Bold faces are drawn this much wider.
const BOLD_WIDTH_FACTOR: f64 = 1.06;
/// Sub-pixel tolerance, so a box filled exactly does not count as overflow.
const EPSILON_PX: f64 = 1e-6;

/// Result of wrapping one text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrap {
    pub lines: usize,
    /// Width of the widest single word, in px.
    pub widest_word: f64,
}

#[derive(Debug, Clone)]
pub struct MetricsOracle {
    viewport: BoxSize,
    line_height: f64,
}

impl MetricsOracle {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            viewport: BoxSize::new(viewport_width, viewport_height),
            line_height: DEFAULT_LINE_HEIGHT,
        }
    }

    pub fn with_line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height;
        self
    }

    pub fn viewport(&self) -> BoxSize {
        self.viewport
    }

    /// Resolves a css length (`vh` or `px`) to pixels.
    pub fn resolve_length(&self, value: &str) -> Option<f64> {
        let value = value.trim();
        if let Some(vh) = value.strip_suffix("vh") {
            return vh.trim().parse::<f64>().ok().map(|v| v * self.viewport.height / 100.0);
        }
        value
            .strip_suffix("px")
            .unwrap_or(value)
            .trim()
            .parse::<f64>()
            .ok()
    }

    pub fn font_px(&self, surface: &Surface) -> f64 {
        surface
            .var(FONT_SIZE_VAR)
            .and_then(|v| self.resolve_length(v))
            .filter(|px| px.is_finite() && *px >= 0.0)
            .unwrap_or(BASE_FONT_PX)
    }

    fn face(&self, surface: &Surface) -> (&'static FontMetricTable, f64) {
        let family = FontFamily::from_css(surface.var("font-family").unwrap_or("sans-serif"));
        let weight = match surface.var("font-weight") {
            Some("bold") => BOLD_WIDTH_FACTOR,
            _ => 1.0,
        };
        (get_metrics(family), weight)
    }

    /// Greedy word wrap of `text` at `max_width` px.
    ///
    /// Every `\n`-separated paragraph starts a new line; blank paragraphs
    /// still take one line. Empty text takes none.
    pub fn wrap(&self, surface: &Surface, text: &str, max_width: f64) -> Wrap {
        if text.is_empty() {
            return Wrap {
                lines: 0,
                widest_word: 0.0,
            };
        }
        let (metrics, weight) = self.face(surface);
        let em = self.font_px(surface) * weight;
        let space = metrics.space() * em;

        let mut lines = 0;
        let mut widest_word = 0.0_f64;
        for paragraph in text.split('\n') {
            lines += 1;
            let mut current = 0.0_f64;
            let mut first_on_line = true;
            for word in paragraph.split_whitespace() {
                let word_w = metrics.measure_str(word) * em;
                widest_word = widest_word.max(word_w);
                let space_w = if first_on_line { 0.0 } else { space };

                if !first_on_line && current + space_w + word_w > max_width + EPSILON_PX {
                    lines += 1;
                    current = word_w;
                } else {
                    current += space_w + word_w;
                    first_on_line = false;
                }
            }
        }
        Wrap { lines, widest_word }
    }
}

impl LayoutOracle for MetricsOracle {
    fn measure_box(&self, surface: &Surface) -> Result<BoxSize, LayoutError> {
        surface.bounds().ok_or(LayoutError::Detached)
    }

    fn measure_text(&self, surface: &Surface, text: &str) -> Result<TextMetrics, LayoutError> {
        let (metrics, weight) = self.face(surface);
        // A collapsed font still has a measurable aspect at the base size.
        let font_px = Some(self.font_px(surface))
            .filter(|px| *px > 0.0)
            .unwrap_or(BASE_FONT_PX);
        Ok(TextMetrics {
            width: metrics.measure_str(text) * font_px * weight,
            height: font_px,
        })
    }

    fn relative_line_height(&self, _surface: &Surface) -> Result<f64, LayoutError> {
        Ok(self.line_height)
    }

    /// `vh` font sizes resolve against the new height.
    fn resize_viewport(&mut self, viewport: BoxSize) {
        self.viewport = viewport;
    }

    fn is_overflowing(&self, surface: &Surface) -> Result<bool, LayoutError> {
        let bounds = self.measure_box(surface)?;
        let wrap = self.wrap(surface, surface.text(), bounds.width);
        let height = wrap.lines as f64 * self.line_height * self.font_px(surface);
        Ok(height > bounds.height + EPSILON_PX || wrap.widest_word > bounds.width + EPSILON_PX)
    }
}
