//! Auto-Fit Engine: finds the largest font scale at which a surface's
//! content does not overflow its box.
//!
//! # Phases
//! 1. Estimating: a cheap, layout-free guess of how many rows the text will
//!    wrap to, from the character count, the box aspect ratio and the aspect
//!    ratio of a probe glyph pair.
//! 2. Refining: bisection on the scale (in `vh`) between 0 and `100 / rows`,
//!    asking the oracle after every candidate whether the surface overflows,
//!    then a final bisection on the grid of `decimals`-rounded scales. The
//!    committed scale is the largest grid point that fits, so it depends on
//!    the content's fit threshold only, never on the row estimate.
//!
//! The search always runs to completion; a new trigger restarts it from
//! scratch. Oracle errors fail closed: the previous font size is put back.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fit::oracle::{LayoutError, LayoutOracle, FONT_SIZE_VAR};
use crate::render::surface::Surface;

/// Two-character reference string used to measure glyph aspect.
/// Pairs a wide and a narrow glyph; too narrow is safer than too wide.
pub const GLYPH_PROBE: &str = "0l";

/// Largest scale ever committed: one line as tall as the viewport.
pub const SCALE_CEILING: f64 = 100.0;

/// Caller-supplied extra overflow check, e.g. decorative digits that clip
/// before the box does.
pub type AuxOverflow<'a> = &'a dyn Fn(&Surface) -> bool;

// ────────────────────────────────────────────────────────────────────────────
// Tuning
// ────────────────────────────────────────────────────────────────────────────

/// Convergence constants of the search. They affect speed, not correctness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitTuning {
    /// Refining stops once the bracket is within `upper / precision_divisor`.
    pub precision_divisor: f64,
    /// Floor of the refining precision.
    pub min_precision: f64,
    /// Added to the precision when testing the bracket width.
    pub slack: f64,
    /// Decimal places candidates are rounded to.
    pub decimals: i32,
    /// Hard cap on row-estimate bisection steps.
    pub max_estimate_steps: u32,
}

impl Default for FitTuning {
    fn default() -> Self {
        Self {
            precision_divisor: 50.0,
            min_precision: 0.1,
            slack: 0.01,
            decimals: 1,
            max_estimate_steps: 64,
        }
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ────────────────────────────────────────────────────────────────────────────
// Phase 1: row estimate
// ────────────────────────────────────────────────────────────────────────────

/// Estimates the number of rows `char_count` characters wrap to in a box of
/// `container_aspect` (width / height), given the width-to-line-height ratio
/// of one glyph.
///
/// Bisects an integer row count until `rows × ceil(rows × container_aspect /
/// glyph_aspect)` first covers `char_count`. Boxes narrower than one glyph's
/// aspect start the bracket biased toward many rows. Zero characters count as
/// one. Never returns less than 1.
pub fn estimate_rows(
    char_count: usize,
    container_aspect: f64,
    glyph_aspect: f64,
    max_steps: u32,
) -> usize {
    let chars = char_count.max(1) as f64;
    let (mut min, mut max) = if container_aspect < glyph_aspect {
        (chars.sqrt().floor(), chars)
    } else {
        (1.0, chars.sqrt().ceil())
    };
    let capacity = |rows: f64| rows * (rows * container_aspect / glyph_aspect).ceil();

    let mut rows = 1.0_f64;
    let mut steps = 0;
    while ((max - min).abs() > 1.0 || capacity(rows) < chars) && steps < max_steps {
        steps += 1;
        rows = ((max + min) / 2.0).ceil();
        let fits = capacity(rows);
        if fits < chars {
            min = rows;
        } else if fits > chars {
            max = rows;
        } else {
            break;
        }
    }
    rows.max(1.0) as usize
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitPhase {
    #[default]
    Idle,
    Estimating,
    Refining,
    Done,
}

/// One candidate tried during refining.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitProbe {
    pub scale: f64,
    pub overflowed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    pub rows: usize,
    pub char_count: usize,
    pub glyph_aspect: f64,
    /// Committed font scale, in `vh`.
    pub scale: f64,
    pub probes: Vec<FitProbe>,
}

#[derive(Debug, Clone, Default)]
pub struct FitEngine {
    tuning: FitTuning,
    phase: FitPhase,
}

impl FitEngine {
    pub fn new(tuning: FitTuning) -> Self {
        Self {
            tuning,
            phase: FitPhase::Idle,
        }
    }

    pub fn tuning(&self) -> &FitTuning {
        &self.tuning
    }

    /// Phase the last search ended in (`Done`, or `Idle` after a failure).
    pub fn phase(&self) -> FitPhase {
        self.phase
    }

    /// Runs a complete two-phase search on `surface` and commits the result
    /// as its font size.
    ///
    /// On error the surface keeps the font size it had before the search.
    pub fn fit<O>(
        &mut self,
        oracle: &O,
        surface: &mut Surface,
        aux: Option<AuxOverflow<'_>>,
    ) -> Result<FitOutcome, LayoutError>
    where
        O: LayoutOracle + ?Sized,
    {
        let previous = surface.var(FONT_SIZE_VAR).map(str::to_string);
        match self.search(oracle, surface, aux) {
            Ok(outcome) => {
                self.phase = FitPhase::Done;
                Ok(outcome)
            }
            Err(err) => {
                match previous {
                    Some(size) => surface.set_var(FONT_SIZE_VAR, size),
                    None => surface.remove_var(FONT_SIZE_VAR),
                }
                self.phase = FitPhase::Idle;
                warn!(error = %err, "fit search failed; previous font size kept");
                Err(err)
            }
        }
    }

    fn search<O>(
        &mut self,
        oracle: &O,
        surface: &mut Surface,
        aux: Option<AuxOverflow<'_>>,
    ) -> Result<FitOutcome, LayoutError>
    where
        O: LayoutOracle + ?Sized,
    {
        self.phase = FitPhase::Estimating;
        // Snapshot before any layout work.
        let char_count = surface.text().chars().count();

        let bounds = oracle.measure_box(surface)?;
        if !(bounds.width > 0.0 && bounds.height > 0.0)
            || !bounds.width.is_finite()
            || !bounds.height.is_finite()
        {
            return Err(LayoutError::DegenerateBox {
                width: bounds.width,
                height: bounds.height,
            });
        }
        let container_aspect = bounds.width / bounds.height;

        let glyph_probe = oracle.measure_text(surface, GLYPH_PROBE)?;
        let line_height = oracle.relative_line_height(surface)?;
        let probe_chars = GLYPH_PROBE.chars().count() as f64;
        let glyph_aspect = glyph_probe.width / (probe_chars * glyph_probe.height * line_height);
        if !(glyph_aspect.is_finite() && glyph_aspect > 0.0) {
            return Err(LayoutError::DegenerateGlyph);
        }

        let rows = estimate_rows(
            char_count,
            container_aspect,
            glyph_aspect,
            self.tuning.max_estimate_steps,
        );
        debug!(char_count, container_aspect, glyph_aspect, rows, "fit rows estimated");

        self.phase = FitPhase::Refining;
        let decimals = self.tuning.decimals;
        let mut max = (100.0 / rows as f64).max(1.0);
        let mut min = 0.0_f64;
        let precision =
            round_to(max / self.tuning.precision_divisor, decimals).max(self.tuning.min_precision);

        let mut probes = Vec::new();
        let mut overflow_seen = false;
        while (max - min).abs() > precision + self.tuning.slack {
            let candidate = round_to((max + min) / 2.0, decimals);
            if candidate <= min || candidate >= max {
                break;
            }
            let fits = probe(oracle, surface, aux, candidate, &mut probes)?;
            if fits {
                min = candidate;
            } else {
                max = candidate;
                overflow_seen = true;
            }
        }

        // Finish on the fixed candidate grid, between a tested fit (or 0) and
        // a tested overflow, so the result is the largest fitting grid point
        // whatever bracket the row estimate produced.
        let step = 10f64.powi(-decimals);
        let at = |index: i64| round_to(index as f64 * step, decimals);
        let mut low = (min / step).round() as i64;
        let mut high = if overflow_seen {
            (max / step).round() as i64
        } else {
            let ceiling = (SCALE_CEILING / step).round() as i64;
            if ceiling > low && !probe(oracle, surface, aux, at(ceiling), &mut probes)? {
                ceiling
            } else {
                low = low.max(ceiling);
                low + 1
            }
        };
        while high - low > 1 {
            let index = low + (high - low) / 2;
            if probe(oracle, surface, aux, at(index), &mut probes)? {
                low = index;
            } else {
                high = index;
            }
        }

        let scale = at(low);
        oracle.apply_candidate_size(surface, scale);
        debug!(scale, probes = probes.len(), "fit committed");

        Ok(FitOutcome {
            rows,
            char_count,
            glyph_aspect,
            scale,
            probes,
        })
    }
}

/// Applies `scale`, records the probe and returns whether it fits.
fn probe<O>(
    oracle: &O,
    surface: &mut Surface,
    aux: Option<AuxOverflow<'_>>,
    scale: f64,
    probes: &mut Vec<FitProbe>,
) -> Result<bool, LayoutError>
where
    O: LayoutOracle + ?Sized,
{
    oracle.apply_candidate_size(surface, scale);
    let fits = !overflows(oracle, surface, aux)?;
    probes.push(FitProbe {
        scale,
        overflowed: !fits,
    });
    Ok(fits)
}

fn overflows<O>(oracle: &O, surface: &Surface, aux: Option<AuxOverflow<'_>>) -> Result<bool, LayoutError>
where
    O: LayoutOracle + ?Sized,
{
    Ok(oracle.is_overflowing(surface)? || aux.is_some_and(|check| check(surface)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::fit::oracle::TextMetrics;
    use crate::fit::simulated::MetricsOracle;
    use crate::render::surface::BoxSize;

    fn oracle() -> MetricsOracle {
        MetricsOracle::new(1600.0, 900.0)
    }

    fn text_box(text: &str) -> Surface {
        let mut surface = Surface::attached(1600.0, 400.0);
        surface.set_text(text);
        surface
    }

    fn scale_of(surface: &Surface) -> Option<f64> {
        surface.var(FONT_SIZE_VAR)?.strip_suffix("vh")?.parse().ok()
    }

    /// Fails every overflow query after the first `ok_calls`.
    struct FlakyOracle {
        inner: MetricsOracle,
        ok_calls: usize,
        calls: AtomicUsize,
    }

    impl LayoutOracle for FlakyOracle {
        fn measure_box(&self, surface: &Surface) -> Result<BoxSize, LayoutError> {
            self.inner.measure_box(surface)
        }

        fn measure_text(&self, surface: &Surface, text: &str) -> Result<TextMetrics, LayoutError> {
            self.inner.measure_text(surface, text)
        }

        fn relative_line_height(&self, surface: &Surface) -> Result<f64, LayoutError> {
            self.inner.relative_line_height(surface)
        }

        fn is_overflowing(&self, surface: &Surface) -> Result<bool, LayoutError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
                return Err(LayoutError::Detached);
            }
            self.inner.is_overflowing(surface)
        }
    }

    // ── phase 1 ─────────────────────────────────────────────────────────────

    #[test]
    fn test_estimate_rows_wide_box_prefers_few_rows() {
        assert_eq!(estimate_rows(5, 4.0, 0.325, 64), 2);
        assert_eq!(estimate_rows(1, 4.0, 0.325, 64), 1);
    }

    #[test]
    fn test_estimate_rows_narrow_box_prefers_many_rows() {
        // Box narrower than one glyph: each row holds a single character.
        let rows = estimate_rows(16, 0.1, 0.325, 64);
        assert!(rows >= 4, "expected many rows, got {rows}");
    }

    #[test]
    fn test_estimate_rows_zero_chars_is_single_row() {
        assert_eq!(estimate_rows(0, 4.0, 0.325, 64), 1);
        assert_eq!(estimate_rows(0, 0.01, 0.325, 64), 1);
    }

    #[test]
    fn test_round_to_one_decimal() {
        assert_eq!(round_to(31.25, 1), 31.3);
        assert_eq!(round_to(36.84, 1), 36.8);
    }

    // ── scenario ────────────────────────────────────────────────────────────

    #[test]
    fn test_hello_in_wide_box_converges_near_height_bound() {
        let oracle = oracle();
        let mut surface = text_box("HELLO");
        let outcome = FitEngine::default().fit(&oracle, &mut surface, None).unwrap();

        assert!(outcome.rows <= 2, "rows = {}", outcome.rows);
        assert_eq!(outcome.char_count, 5);
        // One 1.2-line-height row in 400px: 400 / 1.2 / 9px-per-vh ≈ 37.04vh.
        assert!(outcome.scale > 35.5 && outcome.scale <= 37.04, "scale = {}", outcome.scale);
        assert_eq!(scale_of(&surface), Some(outcome.scale));
        assert!(!oracle.is_overflowing(&surface).unwrap());
    }

    // ── correctness ─────────────────────────────────────────────────────────

    #[test]
    fn test_committed_scale_is_largest_fitting_probe() {
        let oracle = oracle();
        for text in ["HELLO", "HELLO WORLD", "SOME MUCH LONGER TEXT THAT WILL WRAP OVER LINES"] {
            let mut surface = text_box(text);
            let outcome = FitEngine::default().fit(&oracle, &mut surface, None).unwrap();

            let largest_fit = outcome
                .probes
                .iter()
                .filter(|p| !p.overflowed)
                .map(|p| p.scale)
                .fold(0.0_f64, f64::max);
            assert_eq!(outcome.scale, largest_fit, "{text}");
            assert!(
                outcome.probes.iter().all(|p| !(p.overflowed && p.scale == outcome.scale)),
                "{text}: committed an overflowing probe"
            );
            assert!(!oracle.is_overflowing(&surface).unwrap(), "{text}");
        }
    }

    fn fit_in(oracle: &MetricsOracle, width: f64, height: f64, text: &str) -> f64 {
        let mut surface = Surface::attached(width, height);
        surface.set_text(text);
        FitEngine::default().fit(oracle, &mut surface, None).unwrap().scale
    }

    #[test]
    fn test_scale_never_grows_as_characters_are_appended() {
        let oracle = oracle();
        let boxes = [(1600.0, 400.0), (400.0, 800.0), (800.0, 800.0), (300.0, 200.0)];
        let sources = [
            "HELLO HELLO WORLD, THIS IS BIG TEXT\nON TWO LINES".to_string(),
            "W".repeat(60),
            "AAAAAAAAAA llll 0123456789".to_string(),
        ];
        for (width, height) in boxes {
            for source in &sources {
                let mut previous = f64::INFINITY;
                let mut text = String::new();
                for ch in source.chars() {
                    text.push(ch);
                    let scale = fit_in(&oracle, width, height, &text);
                    assert!(
                        scale <= previous,
                        "{width}x{height}: {text:?} fitted at {scale}, shorter text at {previous}"
                    );
                    previous = scale;
                }
            }
        }
    }

    #[test]
    fn test_committed_scale_is_largest_fitting_grid_point() {
        let oracle = oracle();
        let many_ws = "W".repeat(51);
        for text in ["AAAA", "AAAAA", "HELLO ", "HELLO HELLO ", many_ws.as_str()] {
            let mut surface = text_box(text);
            let scale = FitEngine::default().fit(&oracle, &mut surface, None).unwrap().scale;
            assert!(!oracle.is_overflowing(&surface).unwrap(), "{text}");

            oracle.apply_candidate_size(&mut surface, round_to(scale + 0.1, 1));
            assert!(oracle.is_overflowing(&surface).unwrap(), "{text}: {scale} is not the largest fit");
        }
    }

    #[test]
    fn test_zero_precision_divisor_still_converges() {
        let oracle = oracle();
        let tuning = FitTuning {
            precision_divisor: 0.0,
            ..FitTuning::default()
        };
        let mut surface = text_box("HELLO");
        let outcome = FitEngine::new(tuning).fit(&oracle, &mut surface, None).unwrap();
        assert!(outcome.scale > 35.5 && outcome.scale <= 37.04, "scale = {}", outcome.scale);
    }

    #[test]
    fn test_aux_overflow_caps_scale() {
        let oracle = oracle();
        let mut surface = text_box("12:34");
        let digits_clip = |s: &Surface| scale_of(s).is_some_and(|scale| scale > 20.0);
        let outcome = FitEngine::default()
            .fit(&oracle, &mut surface, Some(&digits_clip))
            .unwrap();
        assert!(outcome.scale <= 20.0 && outcome.scale > 18.0, "scale = {}", outcome.scale);
    }

    // ── edge cases ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_content_does_not_divide_by_zero() {
        let oracle = oracle();
        let mut surface = text_box("");
        let outcome = FitEngine::default().fit(&oracle, &mut surface, None).unwrap();
        assert_eq!(outcome.rows, 1);
        assert_eq!(outcome.char_count, 0);
        assert!(outcome.scale > 90.0 && outcome.scale <= 100.0);
    }

    #[test]
    fn test_degenerate_box_is_rejected() {
        let mut surface = Surface::attached(0.0, 400.0);
        surface.set_text("HELLO");
        let err = FitEngine::default().fit(&oracle(), &mut surface, None).unwrap_err();
        assert_eq!(err, LayoutError::DegenerateBox { width: 0.0, height: 400.0 });
    }

    // ── fail closed ─────────────────────────────────────────────────────────

    #[test]
    fn test_oracle_failure_restores_previous_font_size() {
        let flaky = FlakyOracle {
            inner: oracle(),
            ok_calls: 2,
            calls: AtomicUsize::new(0),
        };
        let mut surface = text_box("HELLO");
        surface.set_var(FONT_SIZE_VAR, "12vh");

        let mut engine = FitEngine::default();
        let err = engine.fit(&flaky, &mut surface, None).unwrap_err();
        assert_eq!(err, LayoutError::Detached);
        assert_eq!(surface.var(FONT_SIZE_VAR), Some("12vh"));
        assert_eq!(engine.phase(), FitPhase::Idle);
    }

    #[test]
    fn test_detached_surface_leaves_no_font_size() {
        let mut surface = Surface::new();
        surface.set_text("HELLO");
        let err = FitEngine::default().fit(&oracle(), &mut surface, None).unwrap_err();
        assert_eq!(err, LayoutError::Detached);
        assert_eq!(surface.var(FONT_SIZE_VAR), None);
    }
}
