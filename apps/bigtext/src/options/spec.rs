//! Spec Compiler: flattens a nested declarative option tree into a flat,
//! ordered table of descriptors.
//!
//! # Tree shape
//! - A leaf declares one option under a key.
//! - A group carries children plus an optional `prefix`, an optional
//!   `context` fan-out list and inheritable attributes.
//!
//! # Naming
//! - Prefixes concatenate with `-`: a group `shadow` inside a group `text`
//!   yields `text-shadow`, and a leaf `color` below it `text-shadow-color`.
//! - A context fan-out compiles the group's children once per context key,
//!   stamping that key's render target and prefixing names with the key.
//!   Each copy is an independent descriptor with its own stored value.
//!
//! Attributes are cloned per branch; nothing is shared between copies.

use std::collections::HashMap;

use thiserror::Error;

use crate::options::descriptor::{CssValue, OptionDescriptor, RecomputeFn, Render, RenderFn};
use crate::options::sanitize::Sanitize;
use crate::options::value::OptionValue;
use crate::render::surface::SurfaceId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("duplicate option name after compilation: {0}")]
    DuplicateName(String),

    #[error("empty key, prefix or context key in option tree")]
    EmptyKey,
}

// ────────────────────────────────────────────────────────────────────────────
// Declarative tree
// ────────────────────────────────────────────────────────────────────────────

/// Attributes inherited from groups down to the leaves that don't set them.
#[derive(Debug, Clone, Default)]
pub struct OptionAttrs {
    pub sanitize: Option<Sanitize>,
    pub css_value: Option<CssValue>,
    pub target: Option<SurfaceId>,
    pub triggers_refit: Option<bool>,
    pub include_in_export: Option<bool>,
}

impl OptionAttrs {
    /// Merges `self` over `parent`; `self` wins on conflict.
    fn over(&self, parent: &OptionAttrs) -> OptionAttrs {
        OptionAttrs {
            sanitize: self.sanitize.or(parent.sanitize),
            css_value: self.css_value.or(parent.css_value),
            target: self.target.or(parent.target),
            triggers_refit: self.triggers_refit.or(parent.triggers_refit),
            include_in_export: self.include_in_export.or(parent.include_in_export),
        }
    }
}

/// Definition of a single option, before naming and inheritance.
#[derive(Debug, Clone)]
pub struct OptionDef {
    default: OptionValue,
    attrs: OptionAttrs,
    css_name: Option<String>,
    render: Render,
    recompute: Option<RecomputeFn>,
}

impl OptionDef {
    pub fn new(default: impl Into<OptionValue>) -> Self {
        Self {
            default: default.into(),
            attrs: OptionAttrs::default(),
            css_name: None,
            render: Render::Default,
            recompute: None,
        }
    }

    pub fn sanitize(mut self, sanitize: Sanitize) -> Self {
        self.attrs.sanitize = Some(sanitize);
        self
    }

    pub fn css(mut self, css: CssValue) -> Self {
        self.attrs.css_value = Some(css);
        self
    }

    pub fn css_name(mut self, name: &str) -> Self {
        self.css_name = Some(name.to_string());
        self
    }

    pub fn target(mut self, target: SurfaceId) -> Self {
        self.attrs.target = Some(target);
        self
    }

    pub fn refit(mut self) -> Self {
        self.attrs.triggers_refit = Some(true);
        self
    }

    /// Machine-internal option, left out of shareable exports.
    pub fn hidden(mut self) -> Self {
        self.attrs.include_in_export = Some(false);
        self
    }

    pub fn render(mut self, render: RenderFn) -> Self {
        self.render = Render::Custom(render);
        self
    }

    pub fn derived(mut self, recompute: RecomputeFn) -> Self {
        self.recompute = Some(recompute);
        self
    }
}

/// An internal node: children plus naming and inheritance rules.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: Option<String>,
    context: Vec<(String, SurfaceId)>,
    attrs: OptionAttrs,
    children: Vec<SpecNode>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    /// Adds one fan-out context: children are compiled again under `key`,
    /// rendering to `target`.
    pub fn context(mut self, key: &str, target: SurfaceId) -> Self {
        self.context.push((key.to_string(), target));
        self
    }

    pub fn target(mut self, target: SurfaceId) -> Self {
        self.attrs.target = Some(target);
        self
    }

    pub fn refit(mut self) -> Self {
        self.attrs.triggers_refit = Some(true);
        self
    }

    pub fn leaf(mut self, key: &str, def: OptionDef) -> Self {
        self.children.push(SpecNode::leaf(key, def));
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.children.push(SpecNode::Group(group));
        self
    }
}

#[derive(Debug, Clone)]
pub enum SpecNode {
    Leaf { key: String, def: OptionDef },
    Group(Group),
}

impl SpecNode {
    pub fn leaf(key: &str, def: OptionDef) -> Self {
        Self::Leaf {
            key: key.to_string(),
            def,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Compiled output
// ────────────────────────────────────────────────────────────────────────────

/// Flat, ordered descriptor table with a name index.
#[derive(Debug, Clone)]
pub struct CompiledSpec {
    descriptors: Vec<OptionDescriptor>,
    index: HashMap<String, usize>,
}

impl CompiledSpec {
    pub fn descriptors(&self) -> &[OptionDescriptor] {
        &self.descriptors
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&OptionDescriptor> {
        self.index_of(name).map(|i| &self.descriptors[i])
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Compiles a tree into a flat descriptor table, depth-first.
pub fn compile(root: &SpecNode) -> Result<CompiledSpec, SpecError> {
    let mut descriptors = Vec::new();
    compile_node(root, None, &OptionAttrs::default(), &mut descriptors)?;

    let mut index = HashMap::with_capacity(descriptors.len());
    for (i, d) in descriptors.iter().enumerate() {
        if index.insert(d.name.clone(), i).is_some() {
            return Err(SpecError::DuplicateName(d.name.clone()));
        }
    }
    Ok(CompiledSpec { descriptors, index })
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(p) => format!("{p}-{key}"),
        None => key.to_string(),
    }
}

fn non_empty(key: &str) -> Result<&str, SpecError> {
    if key.is_empty() {
        Err(SpecError::EmptyKey)
    } else {
        Ok(key)
    }
}

fn compile_node(
    node: &SpecNode,
    prefix: Option<&str>,
    inherited: &OptionAttrs,
    out: &mut Vec<OptionDescriptor>,
) -> Result<(), SpecError> {
    match node {
        SpecNode::Leaf { key, def } => {
            let name = join(prefix, non_empty(key)?);
            let attrs = def.attrs.over(inherited);
            out.push(OptionDescriptor {
                css_name: def.css_name.clone().unwrap_or_else(|| name.clone()),
                name,
                default: def.default.clone(),
                sanitize: attrs.sanitize,
                css_value: attrs.css_value,
                target: attrs.target.unwrap_or(SurfaceId::Root),
                render: def.render,
                recompute: def.recompute,
                triggers_refit: attrs.triggers_refit.unwrap_or(false),
                include_in_export: attrs.include_in_export.unwrap_or(true),
                scope: prefix.map(str::to_string),
            });
        }
        SpecNode::Group(group) => {
            let attrs = group.attrs.over(inherited);
            let own_prefix = group.prefix.as_deref().map(non_empty).transpose()?;

            if group.context.is_empty() {
                let prefix = match own_prefix {
                    Some(own) => Some(join(prefix, own)),
                    None => prefix.map(str::to_string),
                };
                for child in &group.children {
                    compile_node(child, prefix.as_deref(), &attrs, out)?;
                }
            } else {
                for (context_key, target) in &group.context {
                    let mut stamped = attrs.clone();
                    stamped.target = Some(*target);
                    let context_prefix = join(prefix, non_empty(context_key)?);
                    let prefix = match own_prefix {
                        Some(own) => join(Some(&context_prefix), own),
                        None => context_prefix,
                    };
                    for child in &group.children {
                        compile_node(child, Some(&prefix), &stamped, out)?;
                    }
                }
            }
        }
    }
    Ok(())
}
