//! Property-based tests for highlighting
//!
//! These tests verify the rendering invariants across generated documents
//! and change histories.

#![allow(clippy::redundant_closure_for_method_calls)]

use super::*;
use crate::changes::{ChangeKind, ChangeRecord};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Documents over a tiny alphabet so that changes actually collide
fn arb_base() -> impl Strategy<Value = String> {
    "[abc ]{0,40}"
}

fn arb_value() -> impl Strategy<Value = String> {
    "[abc]{1,3}"
}

fn arb_target() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("h1".to_string()),
        Just(".hero-text".to_string()),
        Just("body/div[2]".to_string()),
    ]
}

fn arb_change() -> impl Strategy<Value = ChangeRecord> {
    (
        prop_oneof![
            Just(ChangeKind::Modification),
            Just(ChangeKind::Addition),
            Just(ChangeKind::Deletion),
        ],
        arb_target(),
        arb_value(),
        arb_value(),
    )
        .prop_map(|(kind, target, old, new)| {
            ChangeRecord::new(kind, target, Some(old), Some(new))
                .expect("generated values are non-empty")
        })
}

fn arb_changes() -> impl Strategy<Value = Vec<ChangeRecord>> {
    proptest::collection::vec(arb_change(), 0..12)
}

// ============================================================================
// Helpers
// ============================================================================

/// Maximum marker depth seen while scanning, or `None` if markers are unbalanced
fn max_marker_depth(text: &str) -> Option<usize> {
    let open = format!("<span {MARKER_ATTRIBUTE}=");
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut rest = text;

    loop {
        let next_open = rest.find(&open);
        let next_close = rest.find(MARKER_CLOSE);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                max_depth = max_depth.max(depth);
                rest = &rest[o + open.len()..];
            }
            (Some(o), None) => {
                depth += 1;
                max_depth = max_depth.max(depth);
                rest = &rest[o + open.len()..];
            }
            (_, Some(c)) => {
                depth = depth.checked_sub(1)?;
                rest = &rest[c + MARKER_CLOSE.len()..];
            }
            (None, None) => break,
        }
    }

    (depth == 0).then_some(max_depth)
}

/// Remove marker markup, leaving the text they wrapped
fn strip_markers(text: &str) -> String {
    let mut out = text.replace(MARKER_CLOSE, "");
    for kind in [MarkerKind::Modified, MarkerKind::Added, MarkerKind::Deleted] {
        out = out.replace(&kind.open_tag(), "");
    }
    out
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_render_is_deterministic(base in arb_base(), changes in arb_changes()) {
        prop_assert_eq!(render(&base, &changes), render(&base, &changes));
    }

    #[test]
    fn prop_markers_never_nest(base in arb_base(), changes in arb_changes()) {
        let rendered = render(&base, &changes);
        let depth = max_marker_depth(&rendered.text);
        prop_assert!(depth.is_some(), "unbalanced markers in {:?}", rendered.text);
        prop_assert!(depth.unwrap_or(0) <= 1, "nested markers in {:?}", rendered.text);
    }

    #[test]
    fn prop_one_outcome_per_change(base in arb_base(), changes in arb_changes()) {
        let rendered = render(&base, &changes);
        prop_assert_eq!(rendered.report.len(), changes.len());

        let applied = rendered.report.iter().filter(|o| o.is_applied()).count();
        let markers = rendered.text.matches(MARKER_CLOSE).count();
        prop_assert_eq!(applied, markers);
    }

    #[test]
    fn prop_prefix_outcomes_are_stable(
        base in arb_base(),
        first in arb_changes(),
        second in arb_changes(),
    ) {
        // Merging a later change-set never changes what happened to earlier ones.
        let before = render(&base, &first);
        let history: Vec<ChangeRecord> = first.iter().chain(second.iter()).cloned().collect();
        let after = render(&base, &history);
        prop_assert_eq!(&after.report[..first.len()], &before.report[..]);
    }

    #[test]
    fn prop_highlight_only_changes_keep_text(base in arb_base(), changes in arb_changes()) {
        let preserving: Vec<ChangeRecord> = changes
            .into_iter()
            .filter(|c| c.kind() != ChangeKind::Modification)
            .collect();
        let rendered = render(&base, &preserving);
        prop_assert_eq!(strip_markers(&rendered.text), base);
    }

    #[test]
    fn prop_unmatched_changes_leave_document_untouched(
        base in arb_base(),
        values in proptest::collection::vec(("[xyz]{1,3}", arb_value()), 1..6),
    ) {
        // New values are drawn from the document alphabet, so they often
        // already occur in it; only the old value decides a match.
        let changes: Vec<ChangeRecord> = values
            .iter()
            .map(|(old, new)| {
                ChangeRecord::modification("", old.clone(), new.clone()).expect("non-empty")
            })
            .collect();
        let rendered = render(&base, &changes);
        prop_assert_eq!(&rendered.text, &base);
        prop_assert_eq!(rendered.unmatched_count(), changes.len());
    }
}
