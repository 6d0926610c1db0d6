//! Proposal error types

use thiserror::Error;

/// Failure of an edit-proposal request, with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProposalError {
    pub kind: ProposalErrorKind,
    pub message: String,
}

impl ProposalError {
    pub fn new(kind: ProposalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProposalErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProposalErrorKind::Timeout, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProposalErrorKind::InvalidResponse, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProposalErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from a proposal backend
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => ProposalErrorKind::Auth,
            429 => ProposalErrorKind::RateLimit,
            400..=499 => ProposalErrorKind::InvalidRequest,
            500..=599 => ProposalErrorKind::ServerError,
            _ => ProposalErrorKind::Unknown,
        };
        Self::new(kind, format!("HTTP {status}: {body}"))
    }
}

impl From<reqwest::Error> for ProposalError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(e.to_string())
        } else if e.is_decode() {
            Self::invalid_response(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalErrorKind {
    /// Connection failures
    Network,
    /// No response within the configured deadline
    Timeout,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Authentication failed (401, 403)
    Auth,
    /// Request rejected (other 4xx)
    InvalidRequest,
    /// Backend answered with something that is not a proposal
    InvalidResponse,
    Unknown,
}

impl ProposalErrorKind {
    /// Whether sending the same instruction again may succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::ServerError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Auth => "auth",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidResponse => "invalid_response",
            Self::Unknown => "unknown",
        }
    }
}
