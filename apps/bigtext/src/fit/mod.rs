// Auto-fit: the two-phase font scale search, the layout oracle it consumes,
// and a headless oracle driven by static font metrics.

pub mod engine;
pub mod metrics;
pub mod oracle;
pub mod simulated;

pub use engine::{estimate_rows, FitEngine, FitOutcome, FitPhase, FitProbe, FitTuning};
pub use oracle::{LayoutError, LayoutOracle, TextMetrics, FONT_SIZE_VAR};
pub use simulated::MetricsOracle;
