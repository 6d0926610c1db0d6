//! Request lifecycle state

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Whether an edit request is in flight. At most one request is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestState {
    /// Ready for a new instruction
    #[default]
    Idle,

    /// Waiting for the proposal source to answer `request_id`
    Pending {
        request_id: String,
        instruction: String,
        started_at: DateTime<Utc>,
    },
}

impl RequestState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending { .. })
    }

    /// Id of the request currently awaited, if any
    pub fn pending_request_id(&self) -> Option<&str> {
        match self {
            RequestState::Pending { request_id, .. } => Some(request_id),
            RequestState::Idle => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Pending { .. } => "pending",
        }
    }
}
