//! The big-text session: one option store, one rendering context, one layout
//! oracle and the fit engine, with the subscriptions they own.
//!
//! Construction imports the initial parameters, renders every option once and
//! only then starts fitting, so a half-imported configuration is never laid
//! out. After that every applied write that asks for a refit, every text edit
//! and every resize runs a complete fit of each visible text surface.
//! `teardown` (also run on drop) cancels every ticker and drops the change
//! listener.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fit::engine::{FitEngine, FitOutcome, FitTuning};
use crate::fit::oracle::{LayoutError, LayoutOracle};
use crate::options::catalog::HAS_COUNTDOWN_CLASS;
use crate::options::spec::CompiledSpec;
use crate::options::store::{ChangeListener, ExportFilter, OptionError, OptionStore};
use crate::options::value::OptionValue;
use crate::render::surface::{BoxSize, RenderingContext, Surface, SurfaceHandle, SurfaceId, SurfaceSnapshot};

/// Parameter carrying the text content in imports and exports.
pub const TEXT_PARAM: &str = "text";

/// Decorative countdown digits are drawn this much wider than their advance.
const DIGIT_CLIP_RESERVE: f64 = 1.1;

/// Everything a client needs to reproduce the rendered page.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub surfaces: BTreeMap<String, SurfaceSnapshot>,
    pub fits: BTreeMap<String, FitOutcome>,
}

pub struct BigText<O: LayoutOracle> {
    id: Uuid,
    store: OptionStore,
    oracle: O,
    engine: FitEngine,
    initialized: bool,
    last_fit: HashMap<SurfaceId, FitOutcome>,
}

impl<O: LayoutOracle> BigText<O> {
    /// Builds a session, imports `params` (the text under [`TEXT_PARAM`],
    /// options under their names, anything else ignored), renders every
    /// option and runs the first fit.
    pub fn new<I, K, V>(
        spec: Arc<CompiledSpec>,
        context: RenderingContext,
        oracle: O,
        tuning: FitTuning,
        params: I,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let id = Uuid::new_v4();
        info!(session = %id, options = spec.len(), "big text session created");

        let mut session = Self {
            id,
            store: OptionStore::new(spec, context),
            oracle,
            engine: FitEngine::new(tuning),
            initialized: false,
            last_fit: HashMap::new(),
        };
        session.import(params);
        session.store.render_all();
        session.store.take_fit_triggers();
        session.initialized = true;
        session.refit_logged();
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &OptionStore {
        &self.store
    }

    pub fn get(&self, name: &str) -> Result<&OptionValue, OptionError> {
        self.store.get(name)
    }

    /// Writes one option; refits when the option asks for it. Returns
    /// whether the name was known.
    pub fn set(&mut self, name: &str, raw: impl Into<OptionValue>) -> bool {
        let applied = self.store.set(name, raw);
        self.refit_if_requested();
        applied
    }

    pub fn text(&self) -> String {
        self.surface(SurfaceId::Text).lock().text().to_string()
    }

    pub fn set_text(&mut self, text: &str) {
        self.surface(SurfaceId::Text).lock().set_text(text);
        if self.initialized {
            self.refit_logged();
        }
    }

    /// Records the new viewport, re-attaches surfaces with new boxes and
    /// refits. `vh` scales resolve against `viewport`.
    pub fn handle_resize<I>(&mut self, viewport: BoxSize, boxes: I) -> Result<(), LayoutError>
    where
        I: IntoIterator<Item = (SurfaceId, BoxSize)>,
    {
        self.oracle.resize_viewport(viewport);
        for (id, bounds) in boxes {
            self.surface(id).lock().set_bounds(Some(bounds));
        }
        self.refit()
    }

    /// Imports a flat key/value mapping through the store's write path.
    pub fn import<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut ignored = 0usize;
        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            if key == TEXT_PARAM {
                self.surface(SurfaceId::Text).lock().set_text(value);
            } else if !self.store.set(key, value) {
                ignored += 1;
            }
        }
        if ignored > 0 {
            debug!(session = %self.id, ignored, "ignored unknown import keys");
        }
        if self.initialized {
            self.store.take_fit_triggers();
            self.refit_logged();
        }
    }

    /// The text followed by every exported option, in compiled order.
    pub fn export(&self) -> Vec<(String, String)> {
        std::iter::once((TEXT_PARAM.to_string(), self.text()))
            .chain(
                self.store
                    .entries(ExportFilter::Exported)
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value.to_string())),
            )
            .collect()
    }

    pub fn on_change(&mut self, listener: ChangeListener) {
        self.store.on_change(listener);
    }

    pub fn last_fit(&self, id: SurfaceId) -> Option<&FitOutcome> {
        self.last_fit.get(&id)
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn surface(&self, id: SurfaceId) -> SurfaceHandle {
        self.store.surfaces().resolve(id).clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let surfaces = SurfaceId::ALL
            .iter()
            .filter(|id| self.store.surfaces().contains(**id))
            .map(|id| (id.to_string(), self.surface(*id).lock().snapshot()))
            .collect();
        let fits = self
            .last_fit
            .iter()
            .map(|(id, outcome)| (id.to_string(), outcome.clone()))
            .collect();
        SessionSnapshot {
            id: self.id,
            surfaces,
            fits,
        }
    }

    // ── fitting ─────────────────────────────────────────────────────────────

    /// Fits every visible text surface. All surfaces are attempted; the
    /// first error is returned.
    pub fn refit(&mut self) -> Result<(), LayoutError> {
        let mut first_error = None;
        for id in self.refit_plan() {
            if let Err(err) = self.fit_surface(id) {
                warn!(session = %self.id, surface = %id, error = %err, "fit failed");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn refit_logged(&mut self) {
        // Failures are already logged per surface.
        let _ = self.refit();
    }

    fn refit_if_requested(&mut self) {
        let triggers = self.store.take_fit_triggers();
        if self.initialized && !triggers.is_empty() {
            debug!(session = %self.id, trigger = %triggers[0].option, "refit requested");
            self.refit_logged();
        }
    }

    fn refit_plan(&self) -> Vec<SurfaceId> {
        let mut plan = vec![SurfaceId::Text];
        if self.surface(SurfaceId::Root).lock().has_class(HAS_COUNTDOWN_CLASS) {
            plan.push(SurfaceId::Countdown);
        }
        plan
    }

    fn fit_surface(&mut self, id: SurfaceId) -> Result<(), LayoutError> {
        let handle = self.surface(id);
        let mut surface = handle.lock();
        let oracle = &self.oracle;
        let outcome = if id == SurfaceId::Countdown {
            let clip = |s: &Surface| digits_clip(oracle, s);
            self.engine.fit(oracle, &mut surface, Some(&clip))?
        } else {
            self.engine.fit(oracle, &mut surface, None)?
        };
        drop(surface);
        debug!(session = %self.id, surface = %id, scale = outcome.scale, "surface fitted");
        self.last_fit.insert(id, outcome);
        Ok(())
    }

    // ── teardown ────────────────────────────────────────────────────────────

    /// Cancels every ticker and drops the change listener. Idempotent.
    pub fn teardown(&mut self) {
        self.store.widgets_mut().cancel_all();
        self.store.clear_listener();
        debug!(session = %self.id, "session torn down");
    }
}

impl<O: LayoutOracle> Drop for BigText<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// True when the countdown's digits, drawn with their decorative reserve,
/// are wider than the box.
fn digits_clip<O: LayoutOracle + ?Sized>(oracle: &O, surface: &Surface) -> bool {
    let Some(bounds) = surface.bounds() else {
        return false;
    };
    oracle
        .measure_text(surface, surface.text())
        .map(|m| m.width * DIGIT_CLIP_RESERVE > bounds.width)
        .unwrap_or(false)
}
