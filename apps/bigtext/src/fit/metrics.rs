//! Static font-metric tables for the four generic css font families.
//!
//! Widths are in em units. The tables are an approximation of real glyph
//! advance widths; the headless oracle only needs them to be consistent, so
//! that a candidate font size either fits or doesn't the same way every time.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font family enum
// ────────────────────────────────────────────────────────────────────────────

/// Generic font families offered by the `*-font-family` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    SansSerif,
    Serif,
    Monospace,
    Cursive,
}

impl FontFamily {
    /// Parses a css generic family name; anything unrecognised is sans-serif.
    pub fn from_css(name: &str) -> Self {
        match name.trim() {
            "serif" => Self::Serif,
            "monospace" => Self::Monospace,
            "cursive" => Self::Cursive,
            _ => Self::SansSerif,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a font family.
///
/// `widths[i]` = width of ASCII character `(i + 32)` before `scale` is
/// applied. Proportional families share one base table and differ by scale.
pub struct FontMetricTable {
    pub family: FontFamily,
    widths: &'static [f32; 95],
    scale: f32,
    /// Fallback width for non-ASCII characters.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f64 {
        let base: f32 = s
            .chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum();
        f64::from(base * self.scale)
    }

    pub fn space(&self) -> f64 {
        f64::from(self.space_width * self.scale)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables
// ────────────────────────────────────────────────────────────────────────────

/// Humanist sans-serif advance widths, the base for every proportional family.
#[rustfmt::skip]
static PROPORTIONAL_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
    // 0     1     2     3     4     5     6     7     8     9
    0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
    // :     ;     <     =     >     ?     @
    0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
    // A     B     C     D     E     F     G     H     I     J     K     L     M
    0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
    // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
    0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
    // [     \     ]     ^     _     `
    0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
    // a     b     c     d     e     f     g     h     i     j     k     l     m
    0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
    // n     o     p     q     r     s     t     u     v     w     x     y     z
    0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
    // {     |     }     ~
    0.33, 0.26, 0.33, 0.59,
];

static MONOSPACE_WIDTHS: [f32; 95] = [0.60; 95];

static SANS_SERIF: FontMetricTable = FontMetricTable {
    family: FontFamily::SansSerif,
    widths: &PROPORTIONAL_WIDTHS,
    scale: 1.0,
    average_char_width: 0.52,
    space_width: 0.25,
};

/// Old-style serifs set noticeably narrower.
static SERIF: FontMetricTable = FontMetricTable {
    family: FontFamily::Serif,
    widths: &PROPORTIONAL_WIDTHS,
    scale: 0.88,
    average_char_width: 0.52,
    space_width: 0.25,
};

static MONOSPACE: FontMetricTable = FontMetricTable {
    family: FontFamily::Monospace,
    widths: &MONOSPACE_WIDTHS,
    scale: 1.0,
    average_char_width: 0.60,
    space_width: 0.60,
};

static CURSIVE: FontMetricTable = FontMetricTable {
    family: FontFamily::Cursive,
    widths: &PROPORTIONAL_WIDTHS,
    scale: 1.08,
    average_char_width: 0.52,
    space_width: 0.25,
};

/// Returns the static metric table for a given font family.
pub fn get_metrics(family: FontFamily) -> &'static FontMetricTable {
    match family {
        FontFamily::SansSerif => &SANS_SERIF,
        FontFamily::Serif => &SERIF,
        FontFamily::Monospace => &MONOSPACE,
        FontFamily::Cursive => &CURSIVE,
    }
}
