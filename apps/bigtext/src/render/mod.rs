// Rendering: surfaces, the dispatcher that projects option values onto them,
// and the countdown ticker widget created lazily by custom renders.

pub mod countdown;
pub mod dispatcher;
pub mod surface;

pub use dispatcher::{render_option, RenderCtx, Widgets};
pub use surface::{BoxSize, RenderingContext, Surface, SurfaceHandle, SurfaceId, SurfaceSnapshot};
