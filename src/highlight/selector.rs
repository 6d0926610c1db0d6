//! Resolving change targets to a region of the document
//!
//! Targets are treated as simple CSS selectors: descendant chains of
//! compounds built from a tag name, `#id` and `.class`. Pseudo classes and
//! attribute selectors are accepted but ignored. Anything else is
//! unresolvable and the caller falls back to the whole document.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9-]*)\b([^<>]*)>").expect("open tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][A-Za-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute pattern is valid")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One compound of a selector chain, e.g. `p.lead#intro`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, tag: &str, attrs: &str) -> bool {
        if let Some(want) = &self.tag {
            if !want.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if attribute(attrs, "id") != Some(want.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let Some(class_attr) = attribute(attrs, "class") else {
                return false;
            };
            let have: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| have.contains(&c.as_str())) {
                return false;
            }
        }
        true
    }
}

/// Resolve `target` to the byte range of the targeted element's content
///
/// Returns `None` when the target cannot be parsed or no element matches.
pub fn resolve(text: &str, target: &str) -> Option<Range<usize>> {
    let compounds = parse_selector(target)?;
    let mut region = 0..text.len();
    for compound in &compounds {
        region = find_element(text, &region, compound)?;
    }
    Some(region)
}

fn parse_selector(target: &str) -> Option<Vec<Compound>> {
    let compounds: Vec<Compound> = target
        .split(|c: char| c.is_whitespace() || c == '>')
        .filter(|token| !token.is_empty())
        .map(parse_compound)
        .collect::<Option<_>>()?;

    if compounds.is_empty() {
        None
    } else {
        Some(compounds)
    }
}

fn parse_compound(token: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut chars = token.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '*' => {
                chars.next();
            }
            '#' => {
                chars.next();
                compound.id = Some(take_ident(&mut chars)?);
            }
            '.' => {
                chars.next();
                compound.classes.push(take_ident(&mut chars)?);
            }
            ':' => {
                // Pseudo classes narrow by position or state; ignored.
                while chars.peek() == Some(&':') {
                    chars.next();
                }
                take_ident(&mut chars)?;
                if chars.peek() == Some(&'(') {
                    skip_until(&mut chars, ')')?;
                }
            }
            '[' => skip_until(&mut chars, ']')?,
            c if is_ident_char(c) && compound.tag.is_none() => {
                compound.tag = Some(take_ident(&mut chars)?);
            }
            _ => return None,
        }
    }

    Some(compound)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}

fn skip_until(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, close: char) -> Option<()> {
    for c in chars.by_ref() {
        if c == close {
            return Some(());
        }
    }
    None
}

/// Find the first element in `region` matching `compound` and return the
/// range of its content
fn find_element(text: &str, region: &Range<usize>, compound: &Compound) -> Option<Range<usize>> {
    let haystack = text.get(region.clone())?;

    for caps in OPEN_TAG.captures_iter(haystack) {
        let whole = caps.get(0)?;
        let tag = caps.get(1)?.as_str();
        let attrs = caps.get(2).map_or("", |m| m.as_str());

        if attrs.trim_end().ends_with('/')
            || VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
            || !compound.matches(tag, attrs)
        {
            continue;
        }

        let content_start = region.start + whole.end();
        let content_end =
            find_closing_tag(text, tag, content_start, region.end).unwrap_or(region.end);
        return Some(content_start..content_end);
    }

    None
}

/// Offset of the closing tag balancing an element whose content starts at `from`
fn find_closing_tag(text: &str, tag: &str, from: usize, limit: usize) -> Option<usize> {
    let pattern = Regex::new(&format!(r"(?i)<(/?){}\b[^<>]*>", regex::escape(tag))).ok()?;
    let haystack = text.get(from..limit)?;

    let mut depth = 1usize;
    for caps in pattern.captures_iter(haystack) {
        let whole = caps.get(0)?;
        if caps.get(1).is_some_and(|m| m.as_str() == "/") {
            depth -= 1;
            if depth == 0 {
                return Some(from + whole.start());
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
    })
}
