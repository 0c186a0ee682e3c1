use std::sync::Arc;

use easel_core::registry::ModelRegistry;
use easel_fal::FalClient;
use easel_history::HistoryStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// The model catalog.
    pub registry: Arc<ModelRegistry>,
    /// Upstream inference and storage client.
    pub fal: Arc<FalClient>,
    /// Bounded generation history.
    pub history: Arc<HistoryStore>,
}
