//! Request and result types at the edit-proposal boundary

use super::ProposalError;
use crate::changes::ChangeRecord;
use crate::conversation::{Attachment, CodeSnippet, Message, MessageRole};
use serde::Serialize;
use serde_json::Value;

/// A prior transcript entry, as seen by a proposal source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

/// Everything a source needs to propose an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalRequest {
    /// Transcript before the current instruction
    pub history: Vec<HistoryEntry>,
    pub base_document: String,
    /// Base document with every change so far highlighted
    pub annotated_document: String,
    pub instruction: String,
    pub attachments: Vec<Attachment>,
}

impl ProposalRequest {
    pub fn new(
        history: &[Message],
        base_document: &str,
        annotated_document: &str,
        instruction: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            history: history
                .iter()
                .map(|m| HistoryEntry {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
            base_document: base_document.to_string(),
            annotated_document: annotated_document.to_string(),
            instruction: instruction.into(),
            attachments,
        }
    }
}

/// A source's answer: narrative text, follow-up suggestions and a change-set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub content: String,
    pub suggestions: Vec<String>,
    pub changes: Vec<ChangeRecord>,
    /// Code shown with the reply; never merged into the document
    pub code_snippets: Vec<CodeSnippet>,
}

impl Proposal {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Parse a backend's free-text answer
    ///
    /// The answer should be a JSON object `{content, suggestions, changes,
    /// code_snippets}`, possibly inside a code fence. Text that is not JSON is
    /// taken as a plain reply without changes. Change entries that fail
    /// validation are dropped one by one so a single bad record does not lose
    /// the whole change-set.
    pub fn from_response_text(text: &str) -> Result<Self, ProposalError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProposalError::invalid_response("Empty response"));
        }

        let Some(value) = extract_json_object(trimmed) else {
            return Ok(Self::text(trimmed));
        };

        let content = value
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProposalError::invalid_response("Response JSON has no `content`"))?;

        let suggestions = value
            .get("suggestions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let changes = value
            .get("changes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match serde_json::from_value::<ChangeRecord>(item.clone()) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                change = %item,
                                "Dropping invalid change record"
                            );
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let code_snippets = value
            .get("code_snippets")
            .or_else(|| value.get("codeSnippets"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<CodeSnippet>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            content,
            suggestions,
            changes,
            code_snippets,
        })
    }
}

fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}
