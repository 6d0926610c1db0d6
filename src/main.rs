//! Localizer - conversational document localization
//!
//! A Rust backend that takes edit instructions in a chat, asks a proposal
//! source for change-sets and renders their cumulative effect as a
//! highlighted view of the original document.

mod api;
mod bootstrap;
mod changes;
mod conversation;
mod highlight;
mod proposal;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use bootstrap::DocumentLocator;
use proposal::{build_source, ProposalConfig};
use runtime::{WorkspaceCoordinator, WorkspaceEvent};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_INSTRUCTION: &str = "Localize this document from Australian to US English";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "localizer=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = std::env::var("LOCALIZER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let document = std::env::var("LOCALIZER_DOCUMENT")
        .ok()
        .filter(|d| !d.trim().is_empty())
        .map(|d| DocumentLocator::parse(&d));

    let initial_instruction = std::env::var("LOCALIZER_INITIAL_INSTRUCTION")
        .unwrap_or_else(|_| DEFAULT_INSTRUCTION.to_string());

    // Proposal source
    let source = build_source(&ProposalConfig::from_env());

    // Base document; an explicitly configured one must load
    let http = reqwest::Client::new();
    let base_text = match &document {
        Some(locator) => bootstrap::resolve(locator, &http).await?,
        None => {
            tracing::warn!("No LOCALIZER_DOCUMENT configured. POST /api/session to load one.");
            String::new()
        }
    };

    let (events, _) = broadcast::channel::<WorkspaceEvent>(128);
    let coordinator = WorkspaceCoordinator::new(source, base_text, events);

    if document.is_some() && !initial_instruction.trim().is_empty() {
        match coordinator.submit(initial_instruction, vec![]).await {
            Ok(ticket) => {
                tracing::info!(request_id = %ticket.request_id, "Submitted initial instruction");
            }
            Err(e) => tracing::warn!(error = %e, "Initial instruction rejected"),
        }
    }

    // Create application state
    let state = AppState::new(coordinator, http);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Shut down cleanly on Ctrl-C
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Localizer server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    Ok(())
}
