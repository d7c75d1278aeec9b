use anyhow::Context;
use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::codec::{export_query, parse_query};
use crate::errors::AppError;
use crate::fit::simulated::MetricsOracle;
use crate::options::catalog::HAS_COUNTDOWN_CLASS;
use crate::options::descriptor::OptionDescriptor;
use crate::options::store::OptionError;
use crate::options::value::OptionValue;
use crate::render::surface::{BoxSize, RenderingContext, Surface, SurfaceId};
use crate::session::{BigText, SessionSnapshot};
use crate::state::AppState;

/// Box the link endpoint lays its throwaway session out in.
const LINK_VIEWPORT: (f64, f64) = (1600.0, 900.0);

#[derive(Serialize)]
pub struct OptionInfo {
    pub name: String,
    pub default: OptionValue,
    pub css_name: String,
    pub target: SurfaceId,
    pub triggers_refit: bool,
    pub exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Deserialize)]
pub struct RenderRequest {
    /// Share query (`text=...&layout=row`), with or without the leading `?`.
    #[serde(default)]
    pub query: String,
    pub viewport: BoxSize,
    pub text_box: BoxSize,
    #[serde(default)]
    pub countdown_box: Option<BoxSize>,
}

#[derive(Serialize)]
pub struct RenderResponse {
    pub session: SessionSnapshot,
    /// Canonical export of the rendered session.
    pub query: String,
}

#[derive(Serialize)]
pub struct LinkResponse {
    pub query: String,
}

impl From<&OptionDescriptor> for OptionInfo {
    fn from(d: &OptionDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            default: d.default.clone(),
            css_name: d.css_name.clone(),
            target: d.target,
            triggers_refit: d.triggers_refit,
            exported: d.include_in_export,
            scope: d.scope.clone(),
        }
    }
}

/// GET /api/v1/options
pub async fn handle_list_options(State(state): State<AppState>) -> Json<Vec<OptionInfo>> {
    Json(state.spec.descriptors().iter().map(OptionInfo::from).collect())
}

/// GET /api/v1/options/:name
pub async fn handle_get_option(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<OptionInfo>, AppError> {
    let descriptor = state
        .spec
        .get(&name)
        .ok_or_else(|| OptionError::Unknown(name.clone()))?;
    Ok(Json(OptionInfo::from(descriptor)))
}

/// POST /api/v1/render
pub async fn handle_render(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, AppError> {
    validate_box("viewport", req.viewport)?;
    validate_box("text_box", req.text_box)?;
    if let Some(countdown_box) = req.countdown_box {
        validate_box("countdown_box", countdown_box)?;
    }

    // Layout probing is CPU-bound; keep it off the async workers.
    let response = tokio::task::spawn_blocking(move || render_session(&state, req))
        .await
        .context("render task did not complete")??;
    Ok(Json(response))
}

fn render_session(state: &AppState, req: RenderRequest) -> Result<RenderResponse, AppError> {
    let mut context = RenderingContext::standard().with(SurfaceId::Text, attached(req.text_box));
    if let Some(countdown_box) = req.countdown_box {
        context = context.with(SurfaceId::Countdown, attached(countdown_box));
    }
    let oracle = MetricsOracle::new(req.viewport.width, req.viewport.height)
        .with_line_height(state.config.line_height);

    let mut session = BigText::new(
        state.spec.clone(),
        context,
        oracle,
        state.config.fit,
        parse_query(&req.query),
    );

    let countdown_shown = session
        .surface(SurfaceId::Root)
        .lock()
        .has_class(HAS_COUNTDOWN_CLASS);
    if countdown_shown && req.countdown_box.is_none() {
        return Err(AppError::Validation(
            "countdown is enabled but no countdown_box was given".to_string(),
        ));
    }
    session.refit()?;

    Ok(RenderResponse {
        query: export_query(&session),
        session: session.snapshot(),
    })
}

/// GET /api/v1/link
pub async fn handle_link(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<LinkResponse> {
    let (width, height) = LINK_VIEWPORT;
    let context = RenderingContext::standard()
        .with(SurfaceId::Text, Surface::attached(width, height))
        .with(SurfaceId::Countdown, Surface::attached(width, height));
    let session = BigText::new(
        state.spec.clone(),
        context,
        MetricsOracle::new(width, height).with_line_height(state.config.line_height),
        state.config.fit,
        parse_query(query.as_deref().unwrap_or("")),
    );
    Json(LinkResponse {
        query: export_query(&session),
    })
}

fn attached(bounds: BoxSize) -> Surface {
    Surface::attached(bounds.width, bounds.height)
}

/// Rejects negative or non-finite sizes. Zero-area boxes pass through and
/// fail the fit instead.
fn validate_box(field: &str, bounds: BoxSize) -> Result<(), AppError> {
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if valid(bounds.width) && valid(bounds.height) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{field} must have finite, non-negative width and height"
        )))
    }
}
