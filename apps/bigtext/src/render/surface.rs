//! Rendering surfaces and the rendering context.
//!
//! A `Surface` is the headless record of one rendering target: its styling
//! variables, class tokens, text content, image source and the pixel box it
//! is attached with. The rendering context maps symbolic surface ids to
//! shared handles so that lazily created children (countdown tickers) can keep
//! writing to their surface after the render call that created them returns.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Symbolic names of the sub-surfaces of a big-text page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceId {
    Root,
    Text,
    Image,
    Countdown,
}

impl SurfaceId {
    pub const ALL: [SurfaceId; 4] = [Self::Root, Self::Text, Self::Image, Self::Countdown];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Text => "text",
            Self::Image => "image",
            Self::Countdown => "countdown",
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel box of an attached surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl BoxSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Surface
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Surface {
    vars: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    text: String,
    image_src: Option<String>,
    bounds: Option<BoxSize>,
    text_writes: u64,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface attached with a pixel box.
    pub fn attached(width: f64, height: f64) -> Self {
        Self {
            bounds: Some(BoxSize::new(width, height)),
            ..Self::default()
        }
    }

    /// Sets the styling variable `--{name}`.
    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name.to_string(), value.into());
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn remove_var(&mut self, name: &str) {
        self.vars.remove(name);
    }

    pub fn add_class(&mut self, token: &str) {
        self.classes.insert(token.to_string());
    }

    pub fn remove_class(&mut self, token: &str) {
        self.classes.remove(token);
    }

    pub fn toggle_class(&mut self, token: &str, present: bool) {
        if present {
            self.add_class(token);
        } else {
            self.remove_class(token);
        }
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.classes.contains(token)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.text_writes += 1;
    }

    /// Number of text writes since creation.
    pub fn text_writes(&self) -> u64 {
        self.text_writes
    }

    pub fn image_src(&self) -> Option<&str> {
        self.image_src.as_deref()
    }

    pub fn set_image_src(&mut self, src: Option<String>) {
        self.image_src = src;
    }

    pub fn bounds(&self) -> Option<BoxSize> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Option<BoxSize>) {
        self.bounds = bounds;
    }

    pub fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            vars: self.vars.clone(),
            classes: self.classes.iter().cloned().collect(),
            text: self.text.clone(),
            image_src: self.image_src.clone(),
        }
    }
}

/// Serializable copy of a surface's rendered state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub vars: BTreeMap<String, String>,
    pub classes: Vec<String>,
    pub text: String,
    pub image_src: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering context
// ────────────────────────────────────────────────────────────────────────────

/// Shared handle to a surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceHandle(Arc<Mutex<Surface>>);

impl SurfaceHandle {
    pub fn new(surface: Surface) -> Self {
        Self(Arc::new(Mutex::new(surface)))
    }

    /// Locks the surface. A poisoned lock still holds a consistent record
    /// (every mutation is a single field write), so it is recovered.
    pub fn lock(&self) -> MutexGuard<'_, Surface> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Symbolic surface ids mapped to their targets. Always holds `Root`.
#[derive(Debug, Clone)]
pub struct RenderingContext {
    root: SurfaceHandle,
    surfaces: HashMap<SurfaceId, SurfaceHandle>,
}

impl RenderingContext {
    pub fn new(root: Surface) -> Self {
        Self {
            root: SurfaceHandle::new(root),
            surfaces: HashMap::new(),
        }
    }

    /// Root, text, image and countdown surfaces, all detached.
    pub fn standard() -> Self {
        Self::new(Surface::new())
            .with(SurfaceId::Text, Surface::new())
            .with(SurfaceId::Image, Surface::new())
            .with(SurfaceId::Countdown, Surface::new())
    }

    pub fn with(mut self, id: SurfaceId, surface: Surface) -> Self {
        if id == SurfaceId::Root {
            self.root = SurfaceHandle::new(surface);
        } else {
            self.surfaces.insert(id, SurfaceHandle::new(surface));
        }
        self
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        id == SurfaceId::Root || self.surfaces.contains_key(&id)
    }

    /// Resolves `id`, falling back to the root surface.
    pub fn resolve(&self, id: SurfaceId) -> &SurfaceHandle {
        self.surfaces.get(&id).unwrap_or(&self.root)
    }

    pub fn root(&self) -> &SurfaceHandle {
        &self.root
    }
}
