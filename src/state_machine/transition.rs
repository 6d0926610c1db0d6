//! Pure state transition function

use super::{Effect, Event, RequestState};
use crate::proposal::{ProposalError, ProposalErrorKind};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: RequestState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: RequestState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition. None of them change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Instruction is empty")]
    InvalidInput,
    #[error("A request is already in progress")]
    RequestInProgress,
    #[error("Response for request {0} is no longer awaited")]
    StaleResponse(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
/// Input is validated before the state is consulted, so an empty submission is
/// rejected as invalid even while a request is pending.
pub fn transition(state: &RequestState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submission
        // ============================================================
        (
            _,
            Event::Submit {
                text, attachments, ..
            },
        ) if text.trim().is_empty() && attachments.is_empty() => Err(TransitionError::InvalidInput),

        (RequestState::Pending { .. }, Event::Submit { .. }) => {
            Err(TransitionError::RequestInProgress)
        }

        (
            RequestState::Idle,
            Event::Submit {
                request_id,
                text,
                attachments,
                submitted_at,
            },
        ) => Ok(TransitionResult::new(RequestState::Pending {
            request_id: request_id.clone(),
            instruction: text.clone(),
            started_at: submitted_at,
        })
        .with_effect(Effect::AppendUserMessage {
            text: text.clone(),
            attachments: attachments.clone(),
        })
        .with_effect(Effect::NotifyStateChange)
        .with_effect(Effect::RequestProposal {
            request_id,
            instruction: text,
            attachments,
        })),

        // ============================================================
        // Proposal outcome
        // ============================================================
        (
            RequestState::Pending {
                request_id: pending,
                ..
            },
            Event::ProposalResolved {
                request_id,
                proposal,
            },
        ) if *pending == request_id => Ok(TransitionResult::new(RequestState::Idle)
            .with_effect(Effect::AppendAssistantResult {
                content: proposal.content,
                suggestions: proposal.suggestions,
                changes: proposal.changes,
                code_snippets: proposal.code_snippets,
            })
            .with_effect(Effect::NotifyStateChange)),

        (
            RequestState::Pending {
                request_id: pending,
                ..
            },
            Event::ProposalFailed { request_id, error },
        ) if *pending == request_id => Ok(TransitionResult::new(RequestState::Idle)
            .with_effect(Effect::AppendFailureMessage {
                content: failure_message(&error),
            })
            .with_effect(Effect::NotifyStateChange)),

        // Answers for a request that is not the pending one (session reset)
        (
            _,
            Event::ProposalResolved { request_id, .. } | Event::ProposalFailed { request_id, .. },
        ) => Err(TransitionError::StaleResponse(request_id)),
    }
}

/// Transcript text shown for a failed request
fn failure_message(error: &ProposalError) -> String {
    match error.kind {
        ProposalErrorKind::Timeout => {
            "The request timed out before any changes were proposed. Please try again.".to_string()
        }
        _ => format!("I couldn't complete that request: {}", error.message),
    }
}
