//! Request coordinator
//!
//! Runs the pure state machine over one workspace session. The session lock
//! is held only while a transition and its synchronous effects run; the
//! proposal call happens in a background task that reports back through
//! `handle_event`.

use super::traits::{BroadcastPreview, PreviewSink};
use super::WorkspaceEvent;

use crate::changes::ChangeRecord;
use crate::conversation::{Attachment, ConversationState, Message};
use crate::highlight::MatchOutcome;
use crate::proposal::{ProposalRequest, ProposalSource};
use crate::state_machine::{transition, Effect, Event, RequestState, TransitionError};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Request state and conversation, always mutated together
struct Session {
    state: RequestState,
    conversation: ConversationState,
}

struct Shared<P> {
    session: Mutex<Session>,
    source: P,
    events: broadcast::Sender<WorkspaceEvent>,
}

/// Single-flight coordinator between the user, the conversation and a
/// proposal source
pub struct RequestCoordinator<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for RequestCoordinator<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Handle to an accepted request
#[derive(Debug)]
pub struct RequestTicket {
    pub request_id: String,
    completion: Option<JoinHandle<()>>,
}

impl RequestTicket {
    /// Wait until the request has been answered (or discarded as stale)
    pub async fn settled(self) {
        let Some(completion) = self.completion else {
            return;
        };
        if let Err(e) = completion.await {
            tracing::error!(request_id = %self.request_id, error = %e, "Proposal task failed");
        }
    }
}

/// Point-in-time view of the session for API clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: RequestState,
    pub messages: Vec<Message>,
    pub base_document: String,
    pub annotated_document: String,
    pub applied_changes: Vec<ChangeRecord>,
    /// Outcome of every applied change
    pub report: Vec<MatchOutcome>,
    /// Outcomes of the latest change-set only
    pub last_report: Vec<MatchOutcome>,
}

impl SessionSnapshot {
    pub fn last_sequence_id(&self) -> i64 {
        self.messages.last().map_or(0, |m| m.sequence_id)
    }
}

impl<P> RequestCoordinator<P>
where
    P: ProposalSource + 'static,
{
    /// Create a coordinator whose previews go out on the event channel
    pub fn new(
        source: P,
        base_text: impl Into<String>,
        events: broadcast::Sender<WorkspaceEvent>,
    ) -> Self {
        let preview = Arc::new(BroadcastPreview::new(events.clone()));
        Self::with_preview(source, base_text, events, preview)
    }

    pub fn with_preview(
        source: P,
        base_text: impl Into<String>,
        events: broadcast::Sender<WorkspaceEvent>,
        preview: Arc<dyn PreviewSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    state: RequestState::Idle,
                    conversation: ConversationState::new(base_text, preview),
                }),
                source,
                events,
            }),
        }
    }

    /// Subscribe to workspace updates
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.shared.events.subscribe()
    }

    /// Submit an instruction
    ///
    /// Rejections leave the transcript untouched. On acceptance the user
    /// message is already appended when this returns; the proposal runs in
    /// the background.
    pub async fn submit(
        &self,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<RequestTicket, TransitionError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let event = Event::Submit {
            request_id: request_id.clone(),
            text: text.into(),
            attachments,
            submitted_at: Utc::now(),
        };

        let request = {
            let mut session = self.shared.session.lock().await;
            self.process_event(&mut session, event)?
        };

        let completion = request.map(|request| {
            let coordinator = self.clone();
            let id = request_id.clone();
            tokio::spawn(async move { coordinator.run_proposal(id, request).await })
        });

        Ok(RequestTicket {
            request_id,
            completion,
        })
    }

    /// Feed a proposal outcome back into the state machine
    pub async fn handle_event(&self, event: Event) -> Result<(), TransitionError> {
        let request_id = event.request_id().to_string();
        let mut session = self.shared.session.lock().await;
        match self.process_event(&mut session, event) {
            Ok(_) => Ok(()),
            Err(e @ TransitionError::StaleResponse(_)) => {
                tracing::warn!(request_id = %request_id, "Discarding stale proposal response");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Start over with a new base document
    ///
    /// A request still in flight is forgotten; its answer will be stale.
    pub async fn open_session(&self, base_text: impl Into<String>) {
        let mut session = self.shared.session.lock().await;
        if let Some(id) = session.state.pending_request_id() {
            tracing::info!(request_id = %id, "Abandoning pending request for new session");
        }
        session.state = RequestState::Idle;
        let _ = self.shared.events.send(WorkspaceEvent::SessionReset);
        session.conversation.reset(base_text);
        self.broadcast_state(&session.state);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.shared.session.lock().await;
        let document = session.conversation.document();
        SessionSnapshot {
            state: session.state.clone(),
            messages: session.conversation.messages().to_vec(),
            base_document: document.base_text().to_string(),
            annotated_document: document.annotated().to_string(),
            applied_changes: document.applied_changes().to_vec(),
            report: document.report().to_vec(),
            last_report: session.conversation.last_report().to_vec(),
        }
    }

    /// Current annotated markup
    pub async fn annotated(&self) -> String {
        self.shared
            .session
            .lock()
            .await
            .conversation
            .annotated()
            .to_string()
    }

    async fn run_proposal(&self, request_id: String, request: ProposalRequest) {
        tracing::info!(
            request_id = %request_id,
            source = self.shared.source.name(),
            history = request.history.len(),
            "Requesting proposal"
        );

        let (event, failure) = match self.shared.source.propose(&request).await {
            Ok(proposal) => (
                Event::ProposalResolved {
                    request_id,
                    proposal,
                },
                None,
            ),
            Err(error) => {
                let message = error.message.clone();
                (Event::ProposalFailed { request_id, error }, Some(message))
            }
        };

        if self.handle_event(event).await.is_ok() {
            if let Some(message) = failure {
                let _ = self.shared.events.send(WorkspaceEvent::Error { message });
            }
        }
    }

    /// Run a transition and its effects under the session lock
    ///
    /// Returns the proposal request to send, if the transition asked for one.
    fn process_event(
        &self,
        session: &mut Session,
        event: Event,
    ) -> Result<Option<ProposalRequest>, TransitionError> {
        let result = transition(&session.state, event)?;
        session.state = result.new_state;

        let mut request = None;
        for effect in result.effects {
            if let Some(r) = self.execute_effect(session, effect) {
                request = Some(r);
            }
        }
        Ok(request)
    }

    fn execute_effect(&self, session: &mut Session, effect: Effect) -> Option<ProposalRequest> {
        match effect {
            Effect::AppendUserMessage { text, attachments } => {
                let message = session.conversation.append_user_message(text, attachments);
                self.broadcast_message(message);
                None
            }

            Effect::RequestProposal {
                request_id,
                instruction,
                attachments,
            } => {
                let conversation = &session.conversation;
                // History stops before the instruction's own message
                let history = conversation
                    .messages()
                    .split_last()
                    .map_or(&[][..], |(_, earlier)| earlier);
                tracing::debug!(request_id = %request_id, "Building proposal request");
                Some(ProposalRequest::new(
                    history,
                    conversation.document().base_text(),
                    conversation.annotated(),
                    instruction,
                    attachments,
                ))
            }

            Effect::AppendAssistantResult {
                content,
                suggestions,
                changes,
                code_snippets,
            } => {
                let message = session.conversation.append_assistant_result(
                    content,
                    suggestions,
                    changes,
                    code_snippets,
                );
                self.broadcast_message(message);
                None
            }

            Effect::AppendFailureMessage { content } => {
                let message = session.conversation.append_failure(content);
                self.broadcast_message(message);
                None
            }

            Effect::NotifyStateChange => {
                tracing::info!(state = session.state.name(), "Request state changed");
                self.broadcast_state(&session.state);
                None
            }
        }
    }

    fn broadcast_message(&self, message: &Message) {
        let message = serde_json::to_value(message).unwrap_or(Value::Null);
        let _ = self.shared.events.send(WorkspaceEvent::Message { message });
    }

    fn broadcast_state(&self, state: &RequestState) {
        let state = serde_json::to_value(state).unwrap_or(Value::Null);
        let _ = self.shared.events.send(WorkspaceEvent::StateChange { state });
    }
}
