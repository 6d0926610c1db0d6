//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::changes::ChangeRecord;
use crate::conversation::Attachment;
use crate::proposal::{Proposal, ProposalError};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_request_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("r1"), Just("r2"), Just("r3")].prop_map(String::from)
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("   ".to_string()),
        "[a-zA-Z ]{1,20}",
    ]
}

fn arb_attachments() -> impl Strategy<Value = Vec<Attachment>> {
    proptest::collection::vec(
        "[a-z]{1,8}".prop_map(|name| Attachment {
            name,
            media_type: "text/plain".to_string(),
            content: "colour".to_string(),
        }),
        0..2,
    )
}

fn arb_proposal() -> impl Strategy<Value = Proposal> {
    ("[a-zA-Z ]{1,20}", 0usize..3).prop_map(|(content, n)| Proposal {
        content,
        suggestions: vec![],
        code_snippets: vec![],
        changes: (0..n)
            .filter_map(|_| ChangeRecord::modification("", "colour", "color").ok())
            .collect(),
    })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (arb_request_id(), arb_text(), arb_attachments()).prop_map(
            |(request_id, text, attachments)| Event::Submit {
                request_id,
                text,
                attachments,
                submitted_at: Utc::now(),
            }
        ),
        (arb_request_id(), arb_proposal())
            .prop_map(|(request_id, proposal)| Event::ProposalResolved { request_id, proposal }),
        (arb_request_id(), "[a-z ]{1,20}").prop_map(|(request_id, message)| {
            Event::ProposalFailed {
                request_id,
                error: ProposalError::network(message),
            }
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = RequestState> {
    prop_oneof![
        Just(RequestState::Idle),
        arb_request_id().prop_map(|request_id| RequestState::Pending {
            request_id,
            instruction: "Localize".to_string(),
            started_at: Utc::now(),
        }),
    ]
}

fn count_effects(effects: &[Effect], pred: impl Fn(&Effect) -> bool) -> usize {
    effects.iter().filter(|e| pred(e)).count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Requests never overlap, and each answer closes the request that was open
    #[test]
    fn prop_single_flight(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = RequestState::Idle;
        let mut started = 0usize;
        let mut finished = 0usize;

        for event in events {
            let was_pending = state.is_pending();
            if let Ok(result) = transition(&state, event) {
                let requests = count_effects(&result.effects, |e| {
                    matches!(e, Effect::RequestProposal { .. })
                });
                let answers = count_effects(&result.effects, |e| {
                    matches!(
                        e,
                        Effect::AppendAssistantResult { .. } | Effect::AppendFailureMessage { .. }
                    )
                });
                prop_assert!(requests <= 1 && answers <= 1);
                if requests == 1 {
                    prop_assert!(!was_pending, "request started while pending");
                }
                started += requests;
                finished += answers;
                state = result.new_state;
            }
            prop_assert!(started - finished <= 1);
            prop_assert_eq!(state.is_pending(), started - finished == 1);
        }
    }

    // Each rejection reason is consistent with the state and the input
    #[test]
    fn prop_rejections_are_classified(state in arb_state(), event in arb_event()) {
        let blank_submit = matches!(
            &event,
            Event::Submit { text, attachments, .. }
                if text.trim().is_empty() && attachments.is_empty()
        );
        let is_submit = matches!(event, Event::Submit { .. });
        let matches_pending = state.pending_request_id() == Some(event.request_id());

        match transition(&state, event) {
            Err(TransitionError::InvalidInput) => prop_assert!(blank_submit),
            Err(TransitionError::RequestInProgress) => {
                prop_assert!(is_submit && !blank_submit && state.is_pending());
            }
            Err(TransitionError::StaleResponse(_)) => {
                prop_assert!(!is_submit && !matches_pending);
            }
            Ok(result) => {
                if is_submit {
                    prop_assert!(!blank_submit && !state.is_pending());
                    prop_assert!(result.new_state.is_pending());
                } else {
                    prop_assert!(matches_pending);
                    prop_assert_eq!(&result.new_state, &RequestState::Idle);
                    prop_assert_eq!(result.effects.last(), Some(&Effect::NotifyStateChange));
                }
            }
        }
    }

    // A failure never merges changes
    #[test]
    fn prop_failure_never_merges(request_id in arb_request_id(), message in "[a-z ]{1,20}") {
        let state = RequestState::Pending {
            request_id: request_id.clone(),
            instruction: "Localize".to_string(),
            started_at: Utc::now(),
        };
        let result = transition(
            &state,
            Event::ProposalFailed { request_id, error: ProposalError::network(message) },
        ).unwrap();
        prop_assert_eq!(
            count_effects(&result.effects, |e| matches!(e, Effect::AppendAssistantResult { .. })),
            0
        );
        prop_assert_eq!(result.new_state, RequestState::Idle);
    }
}
