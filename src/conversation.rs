//! Conversation transcript and annotated document
//!
//! `ConversationState` is the single owner of the message transcript and of
//! the document's highlight state. The annotated view is always re-derived
//! from the base text plus the full applied-change history.

use crate::changes::ChangeRecord;
use crate::highlight::{render, MatchOutcome, Rendered};
use crate::runtime::PreviewSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A text file attached to a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    pub content: String,
}

fn default_media_type() -> String {
    "text/plain".to_string()
}

/// A block of code shown with an assistant reply, e.g. the markup a change
/// produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_snippet_language")]
    pub language: String,
    pub code: String,
}

fn default_snippet_language() -> String {
    "text".to_string()
}

/// A transcript entry. Never modified once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub message_id: String,
    pub sequence_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<ChangeRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippets: Option<Vec<CodeSnippet>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Synthetic message describing a failed request
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Base text plus every change merged so far, and the render derived from them
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedDocument {
    base_text: String,
    applied_changes: Vec<ChangeRecord>,
    rendered: Rendered,
    /// Size of the most recent change-set
    last_merged: usize,
}

impl AnnotatedDocument {
    pub fn new(base_text: impl Into<String>) -> Self {
        let base_text = base_text.into();
        let rendered = render(&base_text, &[]);
        Self {
            base_text,
            applied_changes: Vec::new(),
            rendered,
            last_merged: 0,
        }
    }

    pub fn base_text(&self) -> &str {
        &self.base_text
    }

    pub fn applied_changes(&self) -> &[ChangeRecord] {
        &self.applied_changes
    }

    /// Current annotated markup
    pub fn annotated(&self) -> &str {
        &self.rendered.text
    }

    /// Outcome of each applied change, in application order
    pub fn report(&self) -> &[MatchOutcome] {
        &self.rendered.report
    }

    /// Outcomes of the most recently merged change-set
    pub fn last_report(&self) -> &[MatchOutcome] {
        let report = &self.rendered.report;
        &report[report.len() - self.last_merged..]
    }

    /// Render the full history again from the base text
    pub fn replay(&self) -> Rendered {
        render(&self.base_text, &self.applied_changes)
    }

    fn merge(&mut self, changes: &[ChangeRecord]) {
        self.applied_changes.extend_from_slice(changes);
        self.rendered = self.replay();
        self.last_merged = changes.len();
    }
}

/// Transcript plus annotated document for one workspace session
pub struct ConversationState {
    messages: Vec<Message>,
    document: AnnotatedDocument,
    next_sequence_id: i64,
    preview: Arc<dyn PreviewSink>,
}

impl ConversationState {
    pub fn new(base_text: impl Into<String>, preview: Arc<dyn PreviewSink>) -> Self {
        Self {
            messages: Vec::new(),
            document: AnnotatedDocument::new(base_text),
            next_sequence_id: 1,
            preview,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn document(&self) -> &AnnotatedDocument {
        &self.document
    }

    pub fn annotated(&self) -> &str {
        self.document.annotated()
    }

    pub fn last_report(&self) -> &[MatchOutcome] {
        self.document.last_report()
    }

    /// Start a new session over `base_text`
    pub fn reset(&mut self, base_text: impl Into<String>) {
        self.messages.clear();
        self.document = AnnotatedDocument::new(base_text);
        tracing::info!(
            base_len = self.document.base_text().len(),
            "Conversation reset"
        );
        self.preview.publish(self.document.annotated());
    }

    pub fn append_user_message(
        &mut self,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> &Message {
        let mut message = self.new_message(MessageRole::User, content.into());
        message.attachments = attachments;
        self.push(message)
    }

    /// Append an assistant reply and merge its change-set, if any
    pub fn append_assistant_result(
        &mut self,
        content: impl Into<String>,
        suggestions: Vec<String>,
        changes: Vec<ChangeRecord>,
        code_snippets: Vec<CodeSnippet>,
    ) -> &Message {
        if !changes.is_empty() {
            self.document.merge(&changes);
            let unmatched = self
                .document
                .last_report()
                .iter()
                .filter(|o| !o.is_applied())
                .count();
            tracing::info!(
                merged = changes.len(),
                unmatched,
                total = self.document.applied_changes().len(),
                total_unmatched = self.document.rendered.unmatched_count(),
                "Merged change-set"
            );
            self.preview.publish(self.document.annotated());
        }

        let mut message = self.new_message(MessageRole::Assistant, content.into());
        message.suggestions = (!suggestions.is_empty()).then_some(suggestions);
        message.changes = (!changes.is_empty()).then_some(changes);
        message.code_snippets = (!code_snippets.is_empty()).then_some(code_snippets);
        self.push(message)
    }

    /// Append a synthetic assistant message describing a failed request
    pub fn append_failure(&mut self, content: impl Into<String>) -> &Message {
        let mut message = self.new_message(MessageRole::Assistant, content.into());
        message.is_error = true;
        self.push(message)
    }

    fn new_message(&mut self, role: MessageRole, content: String) -> Message {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        Message {
            message_id: uuid::Uuid::new_v4().to_string(),
            sequence_id,
            role,
            content,
            timestamp: Utc::now(),
            suggestions: None,
            changes: None,
            code_snippets: None,
            attachments: Vec::new(),
            is_error: false,
        }
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}
