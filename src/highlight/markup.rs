//! Highlight marker markup
//!
//! Markers are inline `<span>` elements tagged with `data-change` so the
//! rendering surface (and tests) can tell them apart from document markup.

use serde::{Deserialize, Serialize};

/// Attribute carried by every highlight marker
pub const MARKER_ATTRIBUTE: &str = "data-change";

/// Closing tag of a highlight marker
pub const MARKER_CLOSE: &str = "</span>";

/// Visual kind of a highlighted span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Modified,
    Added,
    Deleted,
}

impl MarkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKind::Modified => "modified",
            MarkerKind::Added => "added",
            MarkerKind::Deleted => "deleted",
        }
    }

    /// Inverse of [`Self::as_str`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "modified" => Some(MarkerKind::Modified),
            "added" => Some(MarkerKind::Added),
            "deleted" => Some(MarkerKind::Deleted),
            _ => None,
        }
    }

    fn style(self) -> &'static str {
        match self {
            MarkerKind::Modified => {
                "background-color: #fef3c7; padding: 2px 4px; border-radius: 2px;"
            }
            MarkerKind::Added => "background-color: #d1fae5; padding: 2px 4px; border-radius: 2px;",
            MarkerKind::Deleted => {
                "background-color: #fee2e2; padding: 2px 4px; border-radius: 2px; text-decoration: line-through;"
            }
        }
    }

    /// Opening tag for this marker kind
    pub fn open_tag(self) -> String {
        format!(
            r#"<span {MARKER_ATTRIBUTE}="{}" style="{}">"#,
            self.as_str(),
            self.style()
        )
    }
}

/// Append `text` wrapped in a marker of the given kind
pub fn wrap_into(out: &mut String, kind: MarkerKind, text: &str) {
    out.push_str(&kind.open_tag());
    out.push_str(text);
    out.push_str(MARKER_CLOSE);
}
