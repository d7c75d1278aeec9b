//! Pure helpers for a control panel bound to the option store.
//!
//! A toggle rule shows, hides or enables a control depending on another
//! option's current value, and is re-evaluated after every write. A set
//! directive (`"a=1;b=2"`) lets one selection write several options at once,
//! e.g. a preset picker.

use serde::Serialize;

use crate::fit::oracle::LayoutOracle;
use crate::options::store::OptionStore;
use crate::options::value::OptionValue;
use crate::session::BigText;

/// Property toggled when a rule doesn't name one: hide unless matched.
pub const DEFAULT_TOGGLE_PROPERTY: &str = "!hidden";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRule {
    pub option: String,
    /// `None` matches any truthy value.
    pub expected: Option<String>,
    pub property: String,
    /// Set the property to the negation of the match.
    pub negate: bool,
}

/// Result of evaluating one rule: the value `property` should take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleState {
    pub option: String,
    pub property: String,
    pub value: bool,
}

impl ToggleRule {
    /// Parses `toggle` (`name` or `name=value`) and an optional property
    /// (`prop` or `!prop`, default [`DEFAULT_TOGGLE_PROPERTY`]).
    pub fn parse(toggle: &str, property: Option<&str>) -> Self {
        let (option, expected) = match toggle.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (toggle.trim(), None),
        };
        let property = property
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_TOGGLE_PROPERTY);
        let (property, negate) = match property.strip_prefix('!') {
            Some(p) => (p, true),
            None => (property, false),
        };
        Self {
            option: option.to_string(),
            expected,
            property: property.to_string(),
            negate,
        }
    }

    /// Whether the option's current value satisfies the rule.
    pub fn matches(&self, value: Option<&OptionValue>) -> bool {
        match (value, &self.expected) {
            (None, _) => false,
            (Some(v), None) => v.is_truthy(),
            (Some(v), Some(expected)) => v.to_string() == *expected,
        }
    }

    pub fn evaluate(&self, value: Option<&OptionValue>) -> ToggleState {
        ToggleState {
            option: self.option.clone(),
            property: self.property.clone(),
            value: self.matches(value) != self.negate,
        }
    }
}

/// Evaluates every rule against the store's current values.
pub fn evaluate_rules(rules: &[ToggleRule], store: &OptionStore) -> Vec<ToggleState> {
    rules
        .iter()
        .map(|rule| rule.evaluate(store.get(&rule.option).ok()))
        .collect()
}

/// Whether the control panel should be shown at all.
pub fn controls_visible(store: &OptionStore) -> bool {
    store
        .get("controls-enabled")
        .is_ok_and(OptionValue::is_truthy)
}

/// Splits `"a=1;b=2"` into pairs. Entries without `=` are skipped.
pub fn parse_set_directive(directive: &str) -> Vec<(&str, &str)> {
    directive
        .split(';')
        .filter_map(|item| item.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Applies every pair of a set directive; returns how many were known.
pub fn apply_set_directive<O: LayoutOracle>(session: &mut BigText<O>, directive: &str) -> usize {
    parse_set_directive(directive)
        .into_iter()
        .filter(|(key, value)| session.set(key, *value))
        .count()
}
