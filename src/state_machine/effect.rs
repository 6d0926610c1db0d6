//! Effects produced by state transitions

use crate::changes::ChangeRecord;
use crate::conversation::{Attachment, CodeSnippet};

/// Effects to be executed after a state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append the instruction to the transcript
    AppendUserMessage {
        text: String,
        attachments: Vec<Attachment>,
    },

    /// Ask the proposal source for an edit (runs outside the session lock)
    RequestProposal {
        request_id: String,
        instruction: String,
        attachments: Vec<Attachment>,
    },

    /// Append the reply and merge its change-set
    AppendAssistantResult {
        content: String,
        suggestions: Vec<String>,
        changes: Vec<ChangeRecord>,
        code_snippets: Vec<CodeSnippet>,
    },

    /// Append a synthetic message describing a failed request
    AppendFailureMessage { content: String },

    /// Broadcast the new request state to subscribers
    NotifyStateChange,
}
