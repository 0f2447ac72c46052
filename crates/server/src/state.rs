//! Application State
//!
//! Shared state across all handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use medbot_agent::Capabilities;
use medbot_config::Settings;

use crate::session::SessionManager;

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Validated settings, fixed for the process lifetime
    pub config: Arc<Settings>,
    /// Session manager
    pub sessions: Arc<SessionManager>,
    /// Prometheus handle, absent when metrics are disabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create application state with the given collaborators
    pub fn new(config: Settings, capabilities: Capabilities) -> Self {
        let sessions = SessionManager::new(
            &config.session,
            capabilities,
            Arc::new(config.dialogue.clone()),
        );
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for the `/metrics` endpoint
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
