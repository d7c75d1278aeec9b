//! Option Store: the single write path for option values.
//!
//! Every write is sanitized, stored, rendered through the dispatcher, queued
//! for a refit when the descriptor asks for one, and reported to the change
//! listener (the binding layer uses it to keep widgets in sync). Initial
//! construction, query-string import and form edits all funnel through `set`,
//! which is why sanitizers must be idempotent.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::options::spec::CompiledSpec;
use crate::options::table::OptionTable;
use crate::options::value::OptionValue;
use crate::render::dispatcher::{render_option, RenderCtx, Widgets};
use crate::render::surface::{RenderingContext, SurfaceId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown option: {0}")]
    Unknown(String),
}

/// Callback receiving `(name, sanitized_value)` after every applied write.
pub type ChangeListener = Box<dyn FnMut(&str, &OptionValue) + Send>;

/// Which options an enumeration yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFilter {
    All,
    /// Only options marked for shareable export.
    Exported,
}

/// A refit requested by a write to an option with `triggers_refit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitTrigger {
    pub option: String,
    pub target: SurfaceId,
}

pub struct OptionStore {
    table: OptionTable,
    surfaces: RenderingContext,
    widgets: Widgets,
    listener: Option<ChangeListener>,
    pending: Vec<FitTrigger>,
}

impl OptionStore {
    /// Creates a store holding every option's sanitized default. Nothing is
    /// rendered until `render_all` or the first `set`.
    pub fn new(spec: Arc<CompiledSpec>, surfaces: RenderingContext) -> Self {
        Self {
            table: OptionTable::new(spec),
            surfaces,
            widgets: Widgets::default(),
            listener: None,
            pending: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&OptionValue, OptionError> {
        self.table
            .get(name)
            .ok_or_else(|| OptionError::Unknown(name.to_string()))
    }

    /// Sanitizes, stores and renders `raw` under `name`.
    ///
    /// Unknown names are ignored (stale or foreign query parameters are
    /// expected); returns whether the write was applied.
    pub fn set(&mut self, name: &str, raw: impl Into<OptionValue>) -> bool {
        let Some(index) = self.table.index_of(name) else {
            debug!(option = name, "ignoring write to unknown option");
            return false;
        };
        let spec = Arc::clone(self.table.spec());
        let descriptor = &spec.descriptors()[index];

        let value = descriptor.sanitize_value(&raw.into());
        self.table.write(index, value);
        render_option(
            &mut RenderCtx::new(&mut self.table, &self.surfaces, &mut self.widgets),
            index,
        );

        if descriptor.triggers_refit {
            self.pending.push(FitTrigger {
                option: descriptor.name.clone(),
                target: descriptor.target,
            });
        }
        if let Some(listener) = self.listener.as_mut() {
            listener(name, self.table.value(index));
        }
        true
    }

    /// Renders every option in compiled order.
    pub fn render_all(&mut self) {
        let mut ctx = RenderCtx::new(&mut self.table, &self.surfaces, &mut self.widgets);
        for index in 0..ctx.table.len() {
            render_option(&mut ctx, index);
        }
    }

    /// `(name, value)` pairs in compiled order.
    pub fn entries(&self, filter: ExportFilter) -> Vec<(&str, &OptionValue)> {
        self.table
            .iter()
            .filter(|(d, _)| filter == ExportFilter::All || d.include_in_export)
            .map(|(d, v)| (d.name.as_str(), v))
            .collect()
    }

    /// Drains the refit requests queued since the last call.
    pub fn take_fit_triggers(&mut self) -> Vec<FitTrigger> {
        std::mem::take(&mut self.pending)
    }

    pub fn on_change(&mut self, listener: ChangeListener) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn spec(&self) -> &Arc<CompiledSpec> {
        self.table.spec()
    }

    pub fn table(&self) -> &OptionTable {
        &self.table
    }

    pub fn surfaces(&self) -> &RenderingContext {
        &self.surfaces
    }

    pub fn widgets(&self) -> &Widgets {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut Widgets {
        &mut self.widgets
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::options::descriptor::CssValue;
    use crate::options::sanitize::Sanitize;
    use crate::options::spec::{compile, Group, OptionDef, SpecNode};

    fn store() -> OptionStore {
        let tree = Group::new()
            .leaf(
                "image-size",
                OptionDef::new(50)
                    .sanitize(Sanitize::Int { min: 0, max: 100 })
                    .css(CssValue::Suffix("%"))
                    .refit(),
            )
            .leaf("justify", OptionDef::new("center").sanitize(Sanitize::OneOf(&["center", "flex-start"])))
            .leaf("internal", OptionDef::new(false).sanitize(Sanitize::Bool).hidden())
            .group(
                Group::new()
                    .context("text", SurfaceId::Text)
                    .context("countdown", SurfaceId::Countdown)
                    .leaf("stroke-width", OptionDef::new(0.01).sanitize(Sanitize::Float { min: 0.0, max: 1.0 })),
            );
        let spec = compile(&SpecNode::Group(tree)).unwrap();
        OptionStore::new(Arc::new(spec), RenderingContext::standard())
    }

    // ── get / set ───────────────────────────────────────────────────────────

    #[test]
    fn test_get_unknown_option_fails() {
        let store = store();
        assert_eq!(
            store.get("nope").unwrap_err(),
            OptionError::Unknown("nope".to_string())
        );
    }

    #[test]
    fn test_set_sanitizes_stores_and_renders() {
        let mut store = store();
        assert!(store.set("image-size", "75px"));
        assert_eq!(store.get("image-size").unwrap(), &OptionValue::Int(75));
        assert_eq!(store.surfaces().root().lock().var("image-size"), Some("75%"));
    }

    #[test]
    fn test_set_unknown_key_is_a_no_op() {
        let mut store = store();
        let before: Vec<(String, OptionValue)> = store
            .entries(ExportFilter::All)
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();

        assert!(!store.set("nonexistent-option", "anything"));

        let after: Vec<(String, OptionValue)> = store
            .entries(ExportFilter::All)
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        assert_eq!(before, after);
        assert!(store.take_fit_triggers().is_empty());
    }

    #[test]
    fn test_refit_triggers_are_queued_and_drained() {
        let mut store = store();
        store.set("justify", "flex-start");
        assert!(store.take_fit_triggers().is_empty());

        store.set("image-size", 10);
        let triggers = store.take_fit_triggers();
        assert_eq!(
            triggers,
            vec![FitTrigger {
                option: "image-size".to_string(),
                target: SurfaceId::Root
            }]
        );
        assert!(store.take_fit_triggers().is_empty());
    }

    #[test]
    fn test_listener_receives_sanitized_value() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut store = store();
        store.on_change(Box::new(move |name, value| {
            sink.lock().unwrap().push((name.to_string(), value.clone()));
        }));
        store.set("justify", "FLEX-START");
        store.set("unknown", "x");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("justify".to_string(), OptionValue::from("flex-start"))]
        );
    }

    // ── fan-out independence ────────────────────────────────────────────────

    #[test]
    fn test_fan_out_copies_are_independent() {
        let mut store = store();
        store.set("text-stroke-width", "0.2");
        assert_eq!(store.get("text-stroke-width").unwrap(), &OptionValue::Float(0.2));
        assert_eq!(store.get("countdown-stroke-width").unwrap(), &OptionValue::Float(0.01));
        assert_eq!(
            store.surfaces().resolve(SurfaceId::Text).lock().var("text-stroke-width"),
            Some("0.2")
        );
    }

    // ── enumeration ─────────────────────────────────────────────────────────

    #[test]
    fn test_entries_respect_export_filter() {
        let store = store();
        let all: Vec<&str> = store.entries(ExportFilter::All).into_iter().map(|(n, _)| n).collect();
        let exported: Vec<&str> = store
            .entries(ExportFilter::Exported)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            all,
            vec!["image-size", "justify", "internal", "text-stroke-width", "countdown-stroke-width"]
        );
        assert!(!exported.contains(&"internal"));
        assert_eq!(exported.len(), all.len() - 1);
    }
}
