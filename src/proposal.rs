//! Edit-proposal sources
//!
//! A proposal source turns an instruction plus the current document into a
//! narrative reply, follow-up suggestions and a change-set.

mod anthropic;
mod error;
mod glossary;
mod registry;
mod types;

pub use anthropic::{AnthropicProposalSource, DEFAULT_MODEL};
pub use error::{ProposalError, ProposalErrorKind};
pub use glossary::GlossaryProposalSource;
pub use registry::{build_source, ProposalConfig};
pub use types::{HistoryEntry, Proposal, ProposalRequest};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Common interface for edit-proposal backends
#[async_trait]
pub trait ProposalSource: Send + Sync {
    /// Ask for a proposal. May take arbitrarily long; callers bound it.
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError>;

    /// Short identifier used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ProposalSource + ?Sized> ProposalSource for Arc<T> {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        (**self).propose(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for proposal sources
pub struct LoggingSource {
    inner: Arc<dyn ProposalSource>,
    name: String,
}

impl LoggingSource {
    pub fn new(inner: Arc<dyn ProposalSource>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl ProposalSource for LoggingSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        let start = std::time::Instant::now();
        let result = self.inner.propose(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(proposal) => {
                tracing::info!(
                    source = %self.name,
                    duration_ms = %duration.as_millis(),
                    changes = proposal.changes.len(),
                    suggestions = proposal.suggestions.len(),
                    "Proposal request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    source = %self.name,
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Proposal request failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Bounds every proposal request by a deadline
pub struct TimeoutSource {
    inner: Arc<dyn ProposalSource>,
    limit: Duration,
}

impl TimeoutSource {
    pub fn new(inner: Arc<dyn ProposalSource>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl ProposalSource for TimeoutSource {
    async fn propose(&self, request: &ProposalRequest) -> Result<Proposal, ProposalError> {
        match tokio::time::timeout(self.limit, self.inner.propose(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProposalError::timeout(format!(
                "No proposal within {:?}",
                self.limit
            ))),
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{GatedProposalSource, MockProposalSource};

    fn request() -> ProposalRequest {
        ProposalRequest::new(&[], "<p>doc</p>", "<p>doc</p>", "Localize", vec![])
    }

    #[tokio::test]
    async fn test_logging_source_passes_result_through() {
        let mock = Arc::new(MockProposalSource::new());
        mock.queue_response(Proposal::text("done"));
        let source = LoggingSource::new(mock.clone());

        assert_eq!(source.name(), "mock");
        let proposal = source.propose(&request()).await.unwrap();
        assert_eq!(proposal.content, "done");
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_logging_source_passes_error_through() {
        let mock = Arc::new(MockProposalSource::new());
        mock.queue_error(ProposalError::from_status(500, "boom"));
        let source = LoggingSource::new(mock);

        let err = source.propose(&request()).await.unwrap_err();
        assert_eq!(err.kind, ProposalErrorKind::ServerError);
    }

    #[tokio::test]
    async fn test_timeout_source_gives_up() {
        let gated = Arc::new(GatedProposalSource::new(Proposal::text("late")));
        let source = TimeoutSource::new(gated, Duration::from_millis(50));

        let err = source.propose(&request()).await.unwrap_err();
        assert_eq!(err.kind, ProposalErrorKind::Timeout);
        assert!(err.message.starts_with("No proposal within"));
    }

    #[tokio::test]
    async fn test_timeout_source_returns_fast_results() {
        let mock = Arc::new(MockProposalSource::new());
        mock.queue_response(Proposal::text("quick"));
        let source = TimeoutSource::new(mock, Duration::from_secs(60));

        assert_eq!(source.propose(&request()).await.unwrap().content, "quick");
    }
}
