//! Anthropic Messages API proposal source

use super::types::{Proposal, ProposalRequest};
use super::{ProposalError, ProposalSource};
use crate::conversation::MessageRole;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const SYSTEM_PROMPT: &str = r#"You are a localization assistant editing a web page for a new regional audience.
The user gives an instruction; you propose concrete text edits to the document.

Answer with a single JSON object and nothing else:
{
  "content": "short explanation of what you changed",
  "suggestions": ["follow-up instruction the user might send next"],
  "changes": [
    {"type": "modification", "target": "<css selector>", "old_value": "text before", "new_value": "text after"},
    {"type": "addition", "target": "<css selector>", "new_value": "text that was added"},
    {"type": "deletion", "target": "<css selector>", "old_value": "text to remove"}
  ],
  "code_snippets": [
    {"label": "what the snippet shows", "language": "html", "code": "updated markup"}
  ]
}

Rules:
- old_value must be copied exactly from text that appears in the document outside any
  <span data-change=...> element; those spans mark edits that were already made.
- Keep each change as small as possible, typically a word or phrase.
- Never put markup tags inside old_value unless the whole tag is included.
- code_snippets is optional; include it when showing the updated markup helps the user."#;

/// Proposal source backed by an Anthropic model
pub struct AnthropicProposalSource {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProposalSource {
    pub fn new(
        api_key: String,
        model: impl Into<String>,
        gateway: Option<&str>,
    ) -> Result<Self, ProposalError> {
        let base_url = match gateway {
            Some(gw) => format!(
                "{}/_/gateway/anthropic/v1/messages",
                gw.trim_end_matches('/')
            ),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ProposalError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url,
        })
    }

    fn translate_request(&self, request: &ProposalRequest) -> AnthropicRequest {
        let mut messages: Vec<AnthropicMessage> = Vec::new();
        for entry in &request.history {
            push_merged(&mut messages, entry.role, &entry.content);
        }
        push_merged(&mut messages, MessageRole::User, &instruction_text(request));

        // The API requires the first message to come from the user.
        if messages.first().is_some_and(|m| m.role == "assistant") {
            messages.insert(
                0,
                AnthropicMessage {
                    role: "user",
                    content: "Let's work on this document.".to_string(),
                },
            );
        }

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: SYSTEM_PROMPT,
            messages,
        }
    }
}

/// Append a message, folding it into the previous one when roles repeat
fn push_merged(messages: &mut Vec<AnthropicMessage>, role: MessageRole, content: &str) {
    let role = match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };
    match messages.last_mut() {
        Some(last) if last.role == role => {
            last.content.push_str("\n\n");
            last.content.push_str(content);
        }
        _ => messages.push(AnthropicMessage {
            role,
            content: content.to_string(),
        }),
    }
}

fn instruction_text(request: &ProposalRequest) -> String {
    let mut text = format!(
        "Instruction: {}\n\nCurrent document (previous edits are highlighted):\n```html\n{}\n```",
        request.instruction, request.annotated_document
    );
    for attachment in &request.attachments {
        let _ = write!(
            text,
            "\n\nAttached file `{}` ({}):\n```\n{}\n```",
            attachment.name, attachment.media_type, attachment.content
        );
    }
    text
}

#[async_trait]
impl ProposalSource for AnthropicProposalSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        let body = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProposalError::from_status(status.as_u16(), &text));
        }

        let parsed: AnthropicResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Proposal::from_response_text(&text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: &'static str,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
