//! Render Dispatcher: projects option values onto rendering surfaces.
//!
//! Default rendering writes the descriptor's css value as a styling variable
//! on its target surface. Custom renders get a `RenderCtx` with read access to
//! every current value and may re-render other descriptors explicitly; that
//! explicit call is the only dependency mechanism. There is no dependency
//! graph and no cycle detection, so custom renders must call dependents in
//! the right order and never form a cycle.
//!
//! Derived options run in two ordered steps: `recompute` writes the option's
//! own value from the other values, then the projection renders it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::options::descriptor::{OptionDescriptor, Render};
use crate::options::table::{OptionTable, OptionView};
use crate::options::value::OptionValue;
use crate::render::countdown::CountdownTicker;
use crate::render::surface::{RenderingContext, SurfaceHandle, SurfaceId};

/// Stateful children created lazily by custom renders, keyed by the name of
/// the option that owns them.
#[derive(Debug, Default)]
pub struct Widgets {
    countdowns: HashMap<String, CountdownTicker>,
}

impl Widgets {
    pub fn countdown(&self, owner: &str) -> Option<&CountdownTicker> {
        self.countdowns.get(owner)
    }

    pub fn countdown_mut(&mut self, owner: &str) -> Option<&mut CountdownTicker> {
        self.countdowns.get_mut(owner)
    }

    pub fn insert_countdown(&mut self, owner: &str, ticker: CountdownTicker) {
        self.countdowns.insert(owner.to_string(), ticker);
    }

    /// Cancels and drops the owner's ticker, if any.
    pub fn remove_countdown(&mut self, owner: &str) {
        if let Some(mut ticker) = self.countdowns.remove(owner) {
            ticker.cancel();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, mut ticker) in self.countdowns.drain() {
            ticker.cancel();
        }
    }

    pub fn active_countdowns(&self) -> usize {
        self.countdowns.values().filter(|t| t.is_running()).count()
    }
}

/// Everything a render routine may touch.
pub struct RenderCtx<'a> {
    pub(crate) table: &'a mut OptionTable,
    pub(crate) surfaces: &'a RenderingContext,
    pub(crate) widgets: &'a mut Widgets,
}

impl<'a> RenderCtx<'a> {
    pub fn new(
        table: &'a mut OptionTable,
        surfaces: &'a RenderingContext,
        widgets: &'a mut Widgets,
    ) -> Self {
        Self {
            table,
            surfaces,
            widgets,
        }
    }

    /// Current value of `descriptor`.
    pub fn value<'s>(&'s self, descriptor: &'s OptionDescriptor) -> &'s OptionValue {
        self.table.get(&descriptor.name).unwrap_or(&descriptor.default)
    }

    /// Read view scoped to `descriptor`'s prefix.
    pub fn view<'v>(&'v self, descriptor: &'v OptionDescriptor) -> OptionView<'v> {
        self.table.view(descriptor.scope.as_deref())
    }

    /// The surface for `id`, falling back to root.
    pub fn surface(&self, id: SurfaceId) -> &SurfaceHandle {
        self.surfaces.resolve(id)
    }

    pub fn widgets(&mut self) -> &mut Widgets {
        self.widgets
    }

    /// Re-renders another option by name. Unknown names are ignored.
    pub fn render(&mut self, name: &str) {
        match self.table.index_of(name) {
            Some(index) => render_option(self, index),
            None => warn!(option = name, "render of unknown option ignored"),
        }
    }

    /// Runs the default projection for `descriptor`.
    pub fn project(&mut self, descriptor: &OptionDescriptor) {
        project_default(self, descriptor);
    }
}

/// Renders the descriptor at `index`: recompute (if derived), then project.
pub fn render_option(ctx: &mut RenderCtx<'_>, index: usize) {
    let spec = Arc::clone(ctx.table.spec());
    let descriptor = &spec.descriptors()[index];

    if let Some(recompute) = descriptor.recompute {
        let derived = recompute(&ctx.table.view(descriptor.scope.as_deref()));
        let value = descriptor.sanitize_value(&derived);
        ctx.table.write(index, value);
    }

    match descriptor.render {
        Render::Default => project_default(ctx, descriptor),
        Render::Custom(render) => render(descriptor, ctx),
    }
}

fn project_default(ctx: &mut RenderCtx<'_>, descriptor: &OptionDescriptor) {
    let css = {
        let view = ctx.table.view(descriptor.scope.as_deref());
        descriptor.css_value(ctx.value(descriptor), &view)
    };
    ctx.surface(descriptor.target)
        .lock()
        .set_var(&descriptor.css_name, css);
}
