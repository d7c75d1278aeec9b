//! The live option table: one stored value per compiled descriptor.

use std::sync::Arc;

use crate::options::descriptor::OptionDescriptor;
use crate::options::spec::CompiledSpec;
use crate::options::value::OptionValue;

/// Values indexed in compiled order, alongside the shared compiled spec.
///
/// Only the store's write path and the dispatcher's recompute step write
/// values; everything else reads.
#[derive(Debug, Clone)]
pub struct OptionTable {
    spec: Arc<CompiledSpec>,
    values: Vec<OptionValue>,
}

impl OptionTable {
    /// Creates a table holding every descriptor's sanitized default.
    pub fn new(spec: Arc<CompiledSpec>) -> Self {
        let values = spec
            .descriptors()
            .iter()
            .map(|d| d.sanitize_value(&d.default))
            .collect();
        Self { spec, values }
    }

    pub fn spec(&self) -> &Arc<CompiledSpec> {
        &self.spec
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.spec.index_of(name)
    }

    pub fn value(&self, index: usize) -> &OptionValue {
        &self.values[index]
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.index_of(name).map(|i| &self.values[i])
    }

    pub(crate) fn write(&mut self, index: usize, value: OptionValue) {
        self.values[index] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(descriptor, value)` pairs in compiled order.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionDescriptor, &OptionValue)> {
        self.spec.descriptors().iter().zip(self.values.iter())
    }

    /// A read-only view resolving sibling names through `scope`.
    pub fn view<'a>(&'a self, scope: Option<&'a str>) -> OptionView<'a> {
        OptionView { table: self, scope }
    }
}

/// Read access to all current values, as handed to css transforms and
/// recompute functions.
#[derive(Debug, Clone, Copy)]
pub struct OptionView<'a> {
    table: &'a OptionTable,
    scope: Option<&'a str>,
}

impl<'a> OptionView<'a> {
    pub fn get(&self, name: &str) -> Option<&'a OptionValue> {
        self.table.get(name)
    }

    /// Looks up a sibling declared under the same prefix.
    pub fn local(&self, key: &str) -> Option<&'a OptionValue> {
        match self.scope {
            Some(scope) => self.table.get(&format!("{scope}-{key}")),
            None => self.table.get(key),
        }
    }

    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_truthy)
    }

    pub fn text(&self, name: &str) -> &'a str {
        self.get(name).and_then(OptionValue::as_text).unwrap_or("")
    }

    /// The css literal another option currently renders to.
    pub fn css_value_of(&self, name: &str) -> Option<String> {
        let index = self.table.index_of(name)?;
        let descriptor = &self.table.spec.descriptors()[index];
        let view = self.table.view(descriptor.scope.as_deref());
        Some(descriptor.css_value(self.table.value(index), &view))
    }
}
