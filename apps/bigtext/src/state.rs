use std::sync::Arc;

use crate::config::Config;
use crate::options::spec::CompiledSpec;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The big-text option catalog, compiled once at startup and shared by
    /// every session.
    pub spec: Arc<CompiledSpec>,
}
