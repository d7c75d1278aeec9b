//! The big-text option tree.
//!
//! Root-level page options come first, then the image options (including the
//! derived `image-mode`), the countdown widget options, and finally the
//! typography group fanned out over the text and countdown surfaces.

use crate::options::descriptor::{CssValue, OptionDescriptor};
use crate::options::sanitize::{parse_timestamp, Sanitize};
use crate::options::spec::{compile, CompiledSpec, Group, OptionDef, SpecError, SpecNode};
use crate::options::table::OptionView;
use crate::options::value::OptionValue;
use crate::render::countdown::{CountdownFormat, CountdownTicker};
use crate::render::dispatcher::RenderCtx;
use crate::render::surface::SurfaceId;

/// Class token on the root surface while an image is shown.
pub const HAS_IMAGE_CLASS: &str = "has-image";
/// Class token on the root surface while the image sits behind the text.
pub const IS_STACKED_CLASS: &str = "is-stacked";
/// Class token on the root surface while a countdown is shown.
pub const HAS_COUNTDOWN_CLASS: &str = "has-countdown";

const PADDINGS: &[&str] = &["narrow", "regular", "wide", "ultrawide"];
const LAYOUTS: &[&str] = &["column", "row"];
const JUSTIFY: &[&str] = &["center", "flex-start", "flex-end"];
const TEXT_ALIGN: &[&str] = &["center", "left", "right", "justify"];
const BACKGROUND_TYPES: &[&str] = &["color", "gradient"];
const GRADIENT_TYPES: &[&str] = &["linear", "radial", "conic"];
const IMAGE_PLACEMENTS: &[&str] = &["start", "end", "background"];
const IMAGE_MODES: &[&str] = &["none", "inline", "stacked"];
const FONT_FAMILIES: &[&str] = &["sans-serif", "serif", "monospace", "cursive"];
const SHADOW_PRESETS: &[&str] = &["regular", "offset", "glow", "fire", "ugly"];

/// Builds the declarative option tree.
pub fn big_text_spec() -> SpecNode {
    let page = Group::new()
        .leaf(
            "background-color",
            OptionDef::new("#ffffff")
                .sanitize(Sanitize::Color)
                .css(CssValue::Custom(with_background_opacity)),
        )
        .leaf("foreground-color", OptionDef::new("#000000").sanitize(Sanitize::Color))
        .leaf(
            "textbox-padding",
            OptionDef::new("regular")
                .sanitize(Sanitize::OneOf(PADDINGS))
                .css(CssValue::VarRef("padding"))
                .css_name("padding")
                .refit(),
        )
        .leaf("controls-enabled", OptionDef::new(true).sanitize(Sanitize::Bool))
        .leaf("layout", OptionDef::new("column").sanitize(Sanitize::OneOf(LAYOUTS)).refit())
        .leaf("justify", OptionDef::new("center").sanitize(Sanitize::OneOf(JUSTIFY)))
        .leaf("text-align", OptionDef::new("center").sanitize(Sanitize::OneOf(TEXT_ALIGN)))
        .leaf(
            "background-type",
            OptionDef::new("color")
                .sanitize(Sanitize::OneOf(BACKGROUND_TYPES))
                .css(CssValue::VarRef("background"))
                .css_name("background"),
        )
        .leaf(
            "background-gradient-type",
            OptionDef::new("linear")
                .sanitize(Sanitize::OneOf(GRADIENT_TYPES))
                .css(CssValue::VarRef("background-gradient"))
                .css_name("background-gradient"),
        )
        .leaf(
            "background-gradient-direction",
            OptionDef::new(0)
                .sanitize(Sanitize::Int { min: 0, max: 360 })
                .css(CssValue::Suffix("deg")),
        )
        .leaf(
            "background-gradient-end",
            OptionDef::new("#999999")
                .sanitize(Sanitize::Color)
                .css(CssValue::Custom(with_background_opacity))
                .css_name("background-gradient-color"),
        )
        .leaf(
            "background-opacity",
            OptionDef::new(255)
                .sanitize(Sanitize::Int { min: 0, max: 255 })
                .css(CssValue::Custom(hex_byte))
                .render(render_background_opacity),
        );

    let image = Group::new()
        .leaf(
            "has-image",
            OptionDef::new(false)
                .sanitize(Sanitize::Bool)
                .css(CssValue::OnOff)
                .render(render_image_input)
                .refit(),
        )
        .leaf(
            "image-url",
            OptionDef::new("")
                .target(SurfaceId::Image)
                .render(render_image_url)
                .refit(),
        )
        .leaf(
            "image-placement",
            OptionDef::new("start")
                .sanitize(Sanitize::OneOf(IMAGE_PLACEMENTS))
                .render(render_image_placement),
        )
        .leaf(
            "image-size",
            OptionDef::new(50)
                .sanitize(Sanitize::Int { min: 0, max: 100 })
                .css(CssValue::Suffix("%"))
                .refit(),
        )
        .leaf(
            "image-mode",
            OptionDef::new("none")
                .sanitize(Sanitize::OneOf(IMAGE_MODES))
                .derived(classify_image_mode)
                .render(render_image_mode)
                .hidden()
                .refit(),
        );

    let countdown = Group::new()
        .prefix("countdown")
        .target(SurfaceId::Countdown)
        .refit()
        .leaf(
            "enabled",
            OptionDef::new(false)
                .sanitize(Sanitize::Bool)
                .css(CssValue::OnOff)
                .render(render_countdown),
        )
        .leaf(
            "timestamp",
            OptionDef::new("")
                .sanitize(Sanitize::Timestamp)
                .render(render_countdown_input),
        )
        .leaf(
            "format",
            OptionDef::new("auto")
                .sanitize(Sanitize::OneOf(CountdownFormat::NAMES))
                .render(render_countdown_input),
        );

    let shadow = Group::new()
        .prefix("shadow")
        .leaf("enabled", OptionDef::new(false).sanitize(Sanitize::Bool).css(CssValue::OnOff))
        .leaf(
            "preset",
            OptionDef::new("regular")
                .sanitize(Sanitize::OneOf(SHADOW_PRESETS))
                .css(CssValue::VarRef("text-shadow"))
                .css_name("text-shadow"),
        )
        .leaf("color", OptionDef::new("#000000").sanitize(Sanitize::Color))
        .leaf("x", em(0.0, -1.0, 1.0))
        .leaf("y", em(0.0, -1.0, 1.0))
        .leaf("blur", em(0.05, 0.0, 1.0));

    let stroke = Group::new()
        .prefix("stroke")
        .leaf("enabled", OptionDef::new(false).sanitize(Sanitize::Bool).css(CssValue::OnOff))
        .leaf("color", OptionDef::new("#000000").sanitize(Sanitize::Color))
        .leaf("width", em(0.01, 0.0, 1.0));

    let typography = Group::new()
        .context("text", SurfaceId::Text)
        .context("countdown", SurfaceId::Countdown)
        .leaf(
            "font-family",
            OptionDef::new("sans-serif")
                .sanitize(Sanitize::OneOf(FONT_FAMILIES))
                .css_name("font-family")
                .refit(),
        )
        .leaf(
            "font-weight-bold",
            OptionDef::new(false)
                .sanitize(Sanitize::Bool)
                .css(CssValue::Choice { on: "bold", off: "normal" })
                .css_name("font-weight")
                .refit(),
        )
        .leaf(
            "font-style-italic",
            OptionDef::new(false)
                .sanitize(Sanitize::Bool)
                .css(CssValue::Choice { on: "italic", off: "normal" })
                .css_name("font-style"),
        )
        .group(shadow)
        .group(stroke);

    SpecNode::Group(
        Group::new()
            .group(page)
            .group(image)
            .group(countdown)
            .group(typography),
    )
}

/// Compiles [`big_text_spec`].
pub fn compiled() -> Result<CompiledSpec, SpecError> {
    compile(&big_text_spec())
}

fn em(default: f64, min: f64, max: f64) -> OptionDef {
    OptionDef::new(default)
        .sanitize(Sanitize::Float { min, max })
        .css(CssValue::Suffix("em"))
}

// ────────────────────────────────────────────────────────────────────────────
// Background
// ────────────────────────────────────────────────────────────────────────────

fn hex_byte(value: &OptionValue, _: &OptionView<'_>) -> String {
    format!("{:02x}", value.as_int().unwrap_or(255).clamp(0, 255))
}

/// `#rrggbb` + the opacity byte, giving an `#rrggbbaa` literal.
fn with_background_opacity(value: &OptionValue, view: &OptionView<'_>) -> String {
    let alpha = view.css_value_of("background-opacity").unwrap_or_default();
    format!("{value}{alpha}")
}

fn render_background_opacity(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    ctx.project(descriptor);
    ctx.render("background-color");
    ctx.render("background-gradient-end");
}

// ────────────────────────────────────────────────────────────────────────────
// Image
// ────────────────────────────────────────────────────────────────────────────

fn classify_image_mode(view: &OptionView<'_>) -> OptionValue {
    let shown = view.is_truthy("has-image") && !view.text("image-url").is_empty();
    let mode = match (shown, view.text("image-placement")) {
        (false, _) => "none",
        (true, "background") => "stacked",
        (true, _) => "inline",
    };
    OptionValue::from(mode)
}

fn render_image_mode(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    let mode = ctx.value(descriptor).to_string();
    let mut root = ctx.surface(SurfaceId::Root).lock();
    root.toggle_class(HAS_IMAGE_CLASS, mode != "none");
    root.toggle_class(IS_STACKED_CLASS, mode == "stacked");
}

fn render_image_input(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    ctx.project(descriptor);
    ctx.render("image-mode");
}

fn render_image_url(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    let url = ctx.value(descriptor).to_string();
    let src = (!url.is_empty()).then_some(url);
    ctx.surface(descriptor.target).lock().set_image_src(src);
    ctx.render("image-mode");
}

fn render_image_placement(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    let placement = ctx.value(descriptor).to_string();
    if placement != "background" {
        ctx.surface(descriptor.target)
            .lock()
            .set_var("image-placement", format!("var(--placement-{placement})"));
    }
    ctx.render("image-mode");
}

// ────────────────────────────────────────────────────────────────────────────
// Countdown
// ────────────────────────────────────────────────────────────────────────────

/// Creates, updates or removes the ticker owned by `countdown-enabled`.
fn render_countdown(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    ctx.project(descriptor);

    let (enabled, timestamp, format) = {
        let view = ctx.view(descriptor);
        (
            ctx.value(descriptor).is_truthy(),
            view.local("timestamp")
                .and_then(OptionValue::as_text)
                .and_then(parse_timestamp),
            CountdownFormat::from_name(
                view.local("format").and_then(OptionValue::as_text).unwrap_or(""),
            ),
        )
    };

    let active = match timestamp {
        Some(target) if enabled => {
            let surface = ctx.surface(descriptor.target).clone();
            let widgets = ctx.widgets();
            match widgets.countdown_mut(&descriptor.name) {
                Some(ticker) => {
                    ticker.set_format(format);
                    ticker.set_timestamp(target);
                }
                None => widgets.insert_countdown(
                    &descriptor.name,
                    CountdownTicker::new(surface, target, format),
                ),
            }
            true
        }
        _ => {
            ctx.widgets().remove_countdown(&descriptor.name);
            false
        }
    };

    ctx.surface(SurfaceId::Root)
        .lock()
        .toggle_class(HAS_COUNTDOWN_CLASS, active);
}

fn render_countdown_input(descriptor: &OptionDescriptor, ctx: &mut RenderCtx<'_>) {
    ctx.project(descriptor);
    ctx.render(&descriptor.sibling("enabled"));
}
