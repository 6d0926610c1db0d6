//! Events that drive the request lifecycle

use crate::conversation::Attachment;
use crate::proposal::{Proposal, ProposalError};
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        request_id: String,
        text: String,
        attachments: Vec<Attachment>,
        submitted_at: DateTime<Utc>,
    },

    // Proposal source events
    ProposalResolved {
        request_id: String,
        proposal: Proposal,
    },
    ProposalFailed {
        request_id: String,
        error: ProposalError,
    },
}

impl Event {
    /// Request this event refers to
    pub fn request_id(&self) -> &str {
        match self {
            Event::Submit { request_id, .. }
            | Event::ProposalResolved { request_id, .. }
            | Event::ProposalFailed { request_id, .. } => request_id,
        }
    }
}
