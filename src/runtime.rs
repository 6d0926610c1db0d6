//! Runtime for the localization workspace
//!
//! Owns the session (request state plus conversation), executes the effects
//! the state machine produces and streams workspace events to subscribers.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{RequestCoordinator, RequestTicket, SessionSnapshot};
pub use traits::*;

use crate::proposal::ProposalSource;
use std::sync::Arc;

/// Type alias for the production coordinator with a configured proposal source
pub type WorkspaceCoordinator = RequestCoordinator<Arc<dyn ProposalSource>>;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    Init {
        session: serde_json::Value,
        last_sequence_id: i64,
    },
    Message {
        message: serde_json::Value,
    },
    StateChange {
        /// Full state as JSON object (e.g., `{"type":"pending","request_id":...}`)
        state: serde_json::Value,
    },
    /// Annotated markup after a merge or a reset
    Preview {
        html: String,
    },
    SessionReset,
    Error {
        message: String,
    },
}
