//! Change highlighting
//!
//! Turns a base document plus an ordered list of change records into
//! annotated markup. Rendering is a pure function of its inputs: callers keep
//! the base text and the full change history and re-render from scratch, so
//! repeated application can never compound markers.

mod markup;
mod matching;
mod selector;

#[cfg(test)]
mod proptests;

pub use markup::{MarkerKind, MARKER_ATTRIBUTE, MARKER_CLOSE};

use crate::changes::{ChangeKind, ChangeRecord};
use matching::{Location, SegmentedText};
use serde::Serialize;

/// Where a change was looked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    /// Inside the element named by the change's target
    Target,
    /// Whole document (target could not be resolved)
    Document,
}

/// What happened to a single change during rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Applied { marker: MarkerKind, scope: MatchScope },
    /// No unmarked occurrence; the change is recorded but has no visual effect
    Unmatched { scope: MatchScope },
}

impl MatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MatchOutcome::Applied { .. })
    }
}

/// Annotated markup plus one outcome per input change, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rendered {
    pub text: String,
    pub report: Vec<MatchOutcome>,
}

impl Rendered {
    pub fn unmatched_count(&self) -> usize {
        self.report.iter().filter(|o| !o.is_applied()).count()
    }
}

/// Render `changes` over `base_text`
pub fn render(base_text: &str, changes: &[ChangeRecord]) -> Rendered {
    let mut document = SegmentedText::new(base_text);
    let report = changes
        .iter()
        .map(|change| apply_change(&mut document, change))
        .collect();

    Rendered {
        text: document.to_markup(),
        report,
    }
}

/// How a change is located: find `needle`, put `replacement` in its
/// place, and wrap it in `marker`
struct Attempt<'a> {
    needle: &'a str,
    replacement: &'a str,
    marker: MarkerKind,
}

fn attempt_for(change: &ChangeRecord) -> Option<Attempt<'_>> {
    match (change.kind(), change.old_value(), change.new_value()) {
        (ChangeKind::Modification, Some(old), Some(new)) => Some(Attempt {
            needle: old,
            replacement: new,
            marker: MarkerKind::Modified,
        }),
        (ChangeKind::Modification | ChangeKind::Addition, _, Some(new)) => Some(Attempt {
            needle: new,
            replacement: new,
            marker: MarkerKind::Added,
        }),
        (ChangeKind::Deletion, Some(old), _) => Some(Attempt {
            needle: old,
            replacement: old,
            marker: MarkerKind::Deleted,
        }),
        _ => None,
    }
}

/// Where `change` would land in `document`, without applying it
fn locate<'c>(
    document: &SegmentedText,
    change: &'c ChangeRecord,
) -> (MatchScope, Option<(Attempt<'c>, Location)>) {
    let plain = document.plain_text();
    let (region, scope) = match selector::resolve(&plain, change.target()) {
        Some(region) => (region, MatchScope::Target),
        None => (0..plain.len(), MatchScope::Document),
    };

    let found = attempt_for(change).and_then(|attempt| {
        document
            .find_unmarked(attempt.needle, &region)
            .map(|location| (attempt, location))
    });
    (scope, found)
}

fn apply_change(document: &mut SegmentedText, change: &ChangeRecord) -> MatchOutcome {
    let (scope, found) = locate(document, change);

    if let Some((attempt, location)) = found {
        document.mark(
            location,
            attempt.needle.len(),
            attempt.replacement,
            attempt.marker,
        );
        return MatchOutcome::Applied {
            marker: attempt.marker,
            scope,
        };
    }

    tracing::debug!(
        kind = change.kind().as_str(),
        target = %change.target(),
        scope = ?scope,
        "Change has no unmarked occurrence, skipping highlight"
    );
    MatchOutcome::Unmatched { scope }
}

/// An annotated document read back into the highlighter's own view
///
/// Proposal sources use this to check where a change would be highlighted
/// before proposing it. Offsets refer to [`AnnotatedView::plain_text`], which
/// is the markup with highlight markers removed and their contents kept.
#[derive(Debug, Clone)]
pub struct AnnotatedView {
    document: SegmentedText,
}

impl AnnotatedView {
    pub fn parse(annotated: &str) -> Self {
        Self {
            document: SegmentedText::from_markup(annotated),
        }
    }

    pub fn plain_text(&self) -> String {
        self.document.plain_text()
    }

    /// Offset at which `change` would be highlighted, if anywhere
    pub fn locate(&self, change: &ChangeRecord) -> Option<usize> {
        let (_, found) = locate(&self.document, change);
        found.map(|(_, location)| self.document.plain_offset(location))
    }

    /// Highlight `change` as the next render pass would
    pub fn apply(&mut self, change: &ChangeRecord) -> MatchOutcome {
        apply_change(&mut self.document, change)
    }
}
