//! Change records proposed for a document
//!
//! A change record describes one edit: what kind it is, where it applies and
//! the text before/after. Records are validated on construction so the
//! highlighter never sees one with nothing to match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of edit a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Modification,
    Addition,
    Deletion,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Modification => "modification",
            ChangeKind::Addition => "addition",
            ChangeKind::Deletion => "deletion",
        }
    }
}

/// Reasons a change record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeError {
    #[error("change record has neither an old nor a new value")]
    Empty,
    #[error("{0} change requires an old value")]
    MissingOldValue(&'static str),
    #[error("{0} change requires a new value")]
    MissingNewValue(&'static str),
}

/// A validated edit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChangeRecord", into = "RawChangeRecord")]
pub struct ChangeRecord {
    kind: ChangeKind,
    target: String,
    old_value: Option<String>,
    new_value: Option<String>,
}

impl ChangeRecord {
    /// Build and validate a record
    pub fn new(
        kind: ChangeKind,
        target: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Result<Self, ChangeError> {
        // Empty strings carry no information; normalise them away.
        let old_value = old_value.filter(|v| !v.is_empty());
        let new_value = new_value.filter(|v| !v.is_empty());

        if old_value.is_none() && new_value.is_none() {
            return Err(ChangeError::Empty);
        }

        match kind {
            ChangeKind::Modification | ChangeKind::Addition if new_value.is_none() => {
                return Err(ChangeError::MissingNewValue(kind.as_str()));
            }
            ChangeKind::Deletion if old_value.is_none() => {
                return Err(ChangeError::MissingOldValue(kind.as_str()));
            }
            _ => {}
        }

        Ok(Self {
            kind,
            target: target.into(),
            // An addition never has prior text; a deletion never has new text.
            old_value: if kind == ChangeKind::Addition {
                None
            } else {
                old_value
            },
            new_value: if kind == ChangeKind::Deletion {
                None
            } else {
                new_value
            },
        })
    }

    pub fn modification(
        target: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Result<Self, ChangeError> {
        Self::new(
            ChangeKind::Modification,
            target,
            Some(old_value.into()),
            Some(new_value.into()),
        )
    }

    #[cfg(test)]
    pub fn addition(
        target: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Result<Self, ChangeError> {
        Self::new(ChangeKind::Addition, target, None, Some(new_value.into()))
    }

    #[cfg(test)]
    pub fn deletion(
        target: impl Into<String>,
        old_value: impl Into<String>,
    ) -> Result<Self, ChangeError> {
        Self::new(ChangeKind::Deletion, target, Some(old_value.into()), None)
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }
}

/// Wire shape of a change record, as produced by proposal backends
///
/// Accepts both `oldValue` and `old_value` spellings so payloads written for
/// the browser preview can be fed straight in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChangeRecord {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ChangeKind,
    #[serde(default, alias = "selector", alias = "path")]
    pub target: String,
    #[serde(
        default,
        alias = "oldValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_value: Option<String>,
    #[serde(
        default,
        alias = "newValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_value: Option<String>,
}

impl TryFrom<RawChangeRecord> for ChangeRecord {
    type Error = ChangeError;

    fn try_from(raw: RawChangeRecord) -> Result<Self, Self::Error> {
        ChangeRecord::new(raw.kind, raw.target, raw.old_value, raw.new_value)
    }
}

impl From<ChangeRecord> for RawChangeRecord {
    fn from(record: ChangeRecord) -> Self {
        Self {
            kind: record.kind,
            target: record.target,
            old_value: record.old_value,
            new_value: record.new_value,
        }
    }
}
