//! HTTP API for the localization workspace

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::runtime::WorkspaceCoordinator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: WorkspaceCoordinator,
    /// Client for fetching documents by URL
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(coordinator: WorkspaceCoordinator, http: reqwest::Client) -> Self {
        Self { coordinator, http }
    }
}
