//! Mock implementations for testing
//!
//! These mocks enable coordinator and conversation tests without real I/O.

use super::traits::PreviewSink;
use crate::proposal::{Proposal, ProposalError, ProposalRequest, ProposalSource};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Proposal Source
// ============================================================================

/// Mock proposal source that returns queued responses
pub struct MockProposalSource {
    responses: Mutex<VecDeque<Result<Proposal, ProposalError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ProposalRequest>>,
}

impl MockProposalSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, proposal: Proposal) {
        self.responses.lock().unwrap().push_back(Ok(proposal));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: ProposalError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ProposalRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockProposalSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProposalSource for MockProposalSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProposalError::network("No mock response queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Gated Proposal Source (for single-flight testing)
// ============================================================================

/// Proposal source that holds its answer until the test releases it
pub struct GatedProposalSource {
    response: Mutex<Option<Result<Proposal, ProposalError>>>,
    gate: Notify,
    /// Notified when a request starts (for test synchronization)
    pub request_started: Arc<Notify>,
    pub requests: Mutex<Vec<ProposalRequest>>,
}

impl GatedProposalSource {
    pub fn new(proposal: Proposal) -> Self {
        Self::with_result(Ok(proposal))
    }

    pub fn failing(error: ProposalError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Proposal, ProposalError>) -> Self {
        Self {
            response: Mutex::new(Some(result)),
            gate: Notify::new(),
            request_started: Arc::new(Notify::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Let the held request answer
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ProposalSource for GatedProposalSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        self.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        self.gate.notified().await;
        self.response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(ProposalError::network("Gated response already used")))
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// ============================================================================
// Recording Preview
// ============================================================================

/// Preview sink that keeps everything published to it
#[derive(Default)]
pub struct RecordingPreview {
    published: Mutex<Vec<String>>,
}

impl RecordingPreview {
    pub fn published(&self) -> Vec<String> {
        self.published.lock().unwrap().clone()
    }
}

impl PreviewSink for RecordingPreview {
    fn publish(&self, markup: &str) {
        self.published.lock().unwrap().push(markup.to_string());
    }
}
