use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is fixed at startup and read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Gemini in production; tests swap in a stub.
    pub generator: Arc<dyn TextGenerator>,
    pub config: Config,
}
