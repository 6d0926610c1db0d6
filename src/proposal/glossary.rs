//! Offline proposal source for regional spelling
//!
//! Sweeps a fixed Australian/British to US English glossary over the visible
//! text of the document. Works without network access, which makes it the
//! default when no model is configured.

use super::types::{Proposal, ProposalRequest};
use super::{ProposalError, ProposalSource};
use crate::changes::ChangeRecord;
use crate::conversation::CodeSnippet;
use crate::highlight::AnnotatedView;
use async_trait::async_trait;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Word stems and their US spelling. Stems match at the start of a word, so
/// `colour` also covers `colours` and `coloured`.
const GLOSSARY: &[(&str, &str)] = &[
    ("aluminium", "aluminum"),
    ("analyse", "analyze"),
    ("apologise", "apologize"),
    ("behaviour", "behavior"),
    ("catalogue", "catalog"),
    ("centre", "center"),
    ("cheque", "check"),
    ("colour", "color"),
    ("defence", "defense"),
    ("favourite", "favorite"),
    ("flavour", "flavor"),
    ("honour", "honor"),
    ("jewellery", "jewelry"),
    ("labour", "labor"),
    ("licence", "license"),
    ("metre", "meter"),
    ("neighbour", "neighbor"),
    ("organisation", "organization"),
    ("organise", "organize"),
    ("programme", "program"),
    ("realise", "realize"),
    ("recognise", "recognize"),
    ("travelled", "traveled"),
    ("tyre", "tire"),
];

/// Target for glossary edits; resolves to the page body when there is one
const GLOSSARY_TARGET: &str = "body";

const SWEEP_SUGGESTIONS: &[&str] = &[
    "Update date formats to MM/DD/YYYY",
    "Convert measurements to imperial",
];

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("markup tag pattern is valid"));

/// Elements whose contents are not shown to the reader
static RAW_TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<style\b[^>]*>.*?</style\s*>|<script\b[^>]*>.*?</script\s*>|<title\b[^>]*>.*?</title\s*>",
    )
    .expect("raw text element pattern is valid")
});

static CHANGE_INSTRUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)change\s+["“']([^"”']+)["”']\s+to\s+["“']([^"”']+)["”']"#)
        .expect("change instruction pattern is valid")
});

/// Words of surrounding text a change may borrow on each side when the word
/// alone would be highlighted somewhere else first
const MAX_CONTEXT_WORDS: usize = 3;

/// Deterministic spelling localizer
#[derive(Debug, Default, Clone, Copy)]
pub struct GlossaryProposalSource;

impl GlossaryProposalSource {
    pub fn new() -> Self {
        Self
    }

    fn propose_sync(request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        let mut view = AnnotatedView::parse(&request.annotated_document);

        if let Some(caps) = CHANGE_INSTRUCTION.captures(&request.instruction) {
            let (from, to) = (&caps[1], &caps[2]);
            return Ok(replace_everywhere(&mut view, from, to));
        }

        Ok(sweep(&mut view))
    }
}

#[async_trait]
impl ProposalSource for GlossaryProposalSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        Self::propose_sync(request)
    }

    fn name(&self) -> &str {
        "glossary"
    }
}

/// A place in the document that should be rewritten: `range` of the plain
/// text becomes `replacement`
struct Occurrence {
    range: Range<usize>,
    replacement: String,
}

/// Propose a change for every occurrence `find` reports in the visible text
///
/// Each change is checked against `view` before it is kept, so it is
/// highlighted exactly where it was found. Occurrences that cannot be
/// reached that way are left out.
fn propose_all(
    view: &mut AnnotatedView,
    find: impl Fn(&str) -> Vec<Occurrence>,
) -> Vec<ChangeRecord> {
    let mut changes = Vec::new();
    let mut skipped = 0;

    // Applied occurrences disappear from the next scan; unreachable ones stay
    // in place, so `skipped` indexes the next one to try.
    loop {
        let plain = view.plain_text();
        let hidden = hidden_ranges(&plain);
        let Some(occurrence) = find(&plain)
            .into_iter()
            .filter(|o| !overlaps(&hidden, &o.range))
            .nth(skipped)
        else {
            break;
        };

        match placed_change(view, &plain, &occurrence) {
            Some(change) => {
                view.apply(&change);
                changes.push(change);
            }
            None => skipped += 1,
        }
    }
    changes
}

/// Smallest change around `occurrence` that the highlighter places on it
fn placed_change(
    view: &AnnotatedView,
    plain: &str,
    occurrence: &Occurrence,
) -> Option<ChangeRecord> {
    let Range { start, end } = occurrence.range;
    context_windows(plain, start, end).into_iter().find_map(|window| {
        let old = plain.get(window.clone())?;
        let new = format!(
            "{}{}{}",
            plain.get(window.start..start)?,
            occurrence.replacement,
            plain.get(end..window.end)?
        );
        let change = ChangeRecord::modification(GLOSSARY_TARGET, old, new).ok()?;
        (view.locate(&change) == Some(window.start)).then_some(change)
    })
}

/// `start..end` followed by the same span widened a word at a time
fn context_windows(text: &str, start: usize, end: usize) -> Vec<Range<usize>> {
    let mut windows = vec![start..end];
    let (mut lo, mut hi) = (start, end);
    for _ in 0..MAX_CONTEXT_WORDS {
        let left = widen_left(text, lo);
        let right = widen_right(text, hi);
        if let Some(l) = left {
            windows.push(l..hi);
        }
        if let Some(r) = right {
            windows.push(lo..r);
        }
        if let (Some(l), Some(r)) = (left, right) {
            windows.push(l..r);
        }
        if left.is_none() && right.is_none() {
            break;
        }
        lo = left.unwrap_or(lo);
        hi = right.unwrap_or(hi);
    }
    windows
}

/// Start of the word before `from`, staying inside one run of text
fn widen_left(text: &str, from: usize) -> Option<usize> {
    let head = text.get(..from)?.trim_end_matches(char::is_whitespace);
    if head.is_empty() || head.ends_with('>') {
        return None;
    }
    let start = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == '>')
        .map_or(0, |(i, c)| i + c.len_utf8());
    Some(start)
}

/// End of the word after `to`, staying inside one run of text
fn widen_right(text: &str, to: usize) -> Option<usize> {
    let tail = text.get(to..)?;
    let trimmed = tail.trim_start_matches(char::is_whitespace);
    if trimmed.is_empty() || trimmed.starts_with('<') {
        return None;
    }
    let word = trimmed
        .find(|c: char| c.is_whitespace() || c == '<')
        .unwrap_or(trimmed.len());
    Some(to + (tail.len() - trimmed.len()) + word)
}

/// Parts of the text a reader never sees: tags and raw-text elements
fn hidden_ranges(text: &str) -> Vec<Range<usize>> {
    MARKUP_TAG
        .find_iter(text)
        .chain(RAW_TEXT_ELEMENT.find_iter(text))
        .map(|m| m.range())
        .collect()
}

fn overlaps(hidden: &[Range<usize>], range: &Range<usize>) -> bool {
    hidden
        .iter()
        .any(|h| h.start < range.end && range.start < h.end)
}

fn replace_everywhere(view: &mut AnnotatedView, from: &str, to: &str) -> Proposal {
    let changes = propose_all(view, |plain| {
        plain
            .match_indices(from)
            .map(|(i, _)| Occurrence {
                range: i..i + from.len(),
                replacement: to.to_string(),
            })
            .collect()
    });

    if changes.is_empty() {
        return Proposal::text(format!(
            "I couldn't find \"{from}\" anywhere in the document that hasn't already been edited."
        ));
    }

    Proposal {
        content: format!(
            "Changed \"{from}\" to \"{to}\" ({} occurrence(s)).",
            changes.len()
        ),
        code_snippets: vec![diff_snippet(&changes)],
        changes,
        ..Proposal::default()
    }
}

/// Before/after lines for each change, shown with the reply
fn diff_snippet(changes: &[ChangeRecord]) -> CodeSnippet {
    let code = changes
        .iter()
        .map(|c| {
            format!(
                "- {}\n+ {}",
                c.old_value().unwrap_or_default(),
                c.new_value().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    CodeSnippet {
        label: Some("Changes".to_string()),
        language: "diff".to_string(),
        code,
    }
}

fn sweep(view: &mut AnnotatedView) -> Proposal {
    let mut changes = Vec::new();
    let mut summary = Vec::new();

    for (stem, us) in GLOSSARY {
        for (from, to) in [
            ((*stem).to_string(), (*us).to_string()),
            (capitalize(stem), capitalize(us)),
        ] {
            let Ok(word) = Regex::new(&format!(r"\b{}\w*", regex::escape(&from))) else {
                continue;
            };
            let found = propose_all(view, |plain| {
                word.find_iter(plain)
                    .map(|m| Occurrence {
                        range: m.range(),
                        replacement: format!("{to}{}", &m.as_str()[from.len()..]),
                    })
                    .collect()
            });
            if !found.is_empty() {
                summary.push(format!("\"{from}\" → \"{to}\""));
                changes.extend(found);
            }
        }
    }

    let suggestions = SWEEP_SUGGESTIONS.iter().map(|s| (*s).to_string()).collect();
    if changes.is_empty() {
        return Proposal {
            content: "The document already uses US spelling; I didn't find anything to change."
                .to_string(),
            suggestions,
            ..Proposal::default()
        };
    }

    Proposal {
        content: format!(
            "I've localized the document from Australian to US English. Here are the main changes: {}.",
            summary.join(", ")
        ),
        suggestions,
        changes,
        ..Proposal::default()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
