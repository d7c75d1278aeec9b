//! Compiled option descriptors.
//!
//! A descriptor is the immutable metadata of one option after the spec tree
//! has been flattened: where it renders, how its stored value is coerced and
//! how that value turns into a styling literal.

use crate::options::sanitize::Sanitize;
use crate::options::table::OptionView;
use crate::options::value::OptionValue;
use crate::render::dispatcher::RenderCtx;
use crate::render::surface::SurfaceId;

/// Custom value → css transform. Receives a view scoped to the descriptor.
pub type CssFn = fn(&OptionValue, &OptionView<'_>) -> String;

/// Full override of rendering for one descriptor.
pub type RenderFn = fn(&OptionDescriptor, &mut RenderCtx<'_>);

/// Recomputes a derived option's value from the other current values.
pub type RecomputeFn = fn(&OptionView<'_>) -> OptionValue;

// ────────────────────────────────────────────────────────────────────────────
// Css transforms
// ────────────────────────────────────────────────────────────────────────────

/// Tagged transform from a stored value to its rendered css literal.
#[derive(Debug, Clone, Copy)]
pub enum CssValue {
    /// `{value}{unit}`, e.g. `0.05em`.
    Suffix(&'static str),
    /// `var(--{prefix}-{value})`, for values naming a stylesheet preset.
    VarRef(&'static str),
    /// `var(--ON)` when truthy, `var(--OFF)` otherwise.
    OnOff,
    /// One of two literals depending on truthiness.
    Choice {
        on: &'static str,
        off: &'static str,
    },
    Custom(CssFn),
}

impl CssValue {
    pub fn compute(&self, value: &OptionValue, view: &OptionView<'_>) -> String {
        match *self {
            Self::Suffix(unit) => format!("{value}{unit}"),
            Self::VarRef(prefix) => format!("var(--{prefix}-{value})"),
            Self::OnOff => {
                if value.is_truthy() {
                    "var(--ON)".to_string()
                } else {
                    "var(--OFF)".to_string()
                }
            }
            Self::Choice { on, off } => {
                if value.is_truthy() {
                    on.to_string()
                } else {
                    off.to_string()
                }
            }
            Self::Custom(f) => f(value, view),
        }
    }
}

/// How the dispatcher projects a descriptor onto its surface.
#[derive(Debug, Clone, Copy, Default)]
pub enum Render {
    /// Write the css value as a styling variable on the target surface.
    #[default]
    Default,
    Custom(RenderFn),
}

// ────────────────────────────────────────────────────────────────────────────
// Descriptor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    pub name: String,
    pub default: OptionValue,
    pub sanitize: Option<Sanitize>,
    pub css_value: Option<CssValue>,
    /// Styling variable written by the default projection (without `--`).
    pub css_name: String,
    pub target: SurfaceId,
    pub render: Render,
    pub recompute: Option<RecomputeFn>,
    pub triggers_refit: bool,
    pub include_in_export: bool,
    /// Prefix this descriptor was compiled under, used to resolve siblings.
    pub scope: Option<String>,
}

impl OptionDescriptor {
    /// Applies the sanitizer, or passes the value through when there is none.
    pub fn sanitize_value(&self, raw: &OptionValue) -> OptionValue {
        match &self.sanitize {
            Some(s) => s.apply(raw, &self.default),
            None => raw.clone(),
        }
    }

    /// Computes the rendered css literal for `value`.
    pub fn css_value(&self, value: &OptionValue, view: &OptionView<'_>) -> String {
        match &self.css_value {
            Some(css) => css.compute(value, view),
            None => value.to_string(),
        }
    }

    /// Name of a sibling declared under the same prefix.
    pub fn sibling(&self, key: &str) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}-{key}"),
            None => key.to_string(),
        }
    }
}
