use std::sync::Arc;

use crate::config::Config;
use crate::extraction::ResumeExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Conversion, model client, prompt and key mapping, built once at startup.
    pub extractor: Arc<ResumeExtractor>,
}
