//! Proposal source selection from configuration

use super::{
    AnthropicProposalSource, GlossaryProposalSource, LoggingSource, ProposalSource, TimeoutSource,
    DEFAULT_MODEL,
};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the proposal backend
#[derive(Debug, Clone)]
pub struct ProposalConfig {
    pub anthropic_api_key: Option<String>,
    /// LLM gateway URL; the gateway handles authentication
    pub gateway: Option<String>,
    pub model: Option<String>,
    pub timeout: Duration,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            gateway: None,
            model: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ProposalConfig {
    pub fn from_env() -> Self {
        let timeout = std::env::var("LOCALIZER_PROPOSAL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
            model: std::env::var("LOCALIZER_MODEL").ok().filter(|m| !m.is_empty()),
            timeout: Duration::from_secs(timeout),
        }
    }
}

/// Build the configured proposal source, wrapped with logging and a deadline
///
/// Uses the Anthropic backend when a key or gateway is configured and the
/// offline glossary otherwise.
pub fn build_source(config: &ProposalConfig) -> Arc<dyn ProposalSource> {
    let inner = select_backend(config);
    tracing::info!(
        source = inner.name(),
        timeout_secs = config.timeout.as_secs(),
        "Proposal source ready"
    );
    let logged: Arc<dyn ProposalSource> = Arc::new(LoggingSource::new(inner));
    Arc::new(TimeoutSource::new(logged, config.timeout))
}

fn select_backend(config: &ProposalConfig) -> Arc<dyn ProposalSource> {
    // In gateway mode the key is a placeholder
    let api_key = match (&config.gateway, &config.anthropic_api_key) {
        (Some(_), _) => "implicit".to_string(),
        (None, Some(key)) => key.clone(),
        (None, None) => return Arc::new(GlossaryProposalSource::new()),
    };

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    match AnthropicProposalSource::new(api_key, model, config.gateway.as_deref()) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            tracing::warn!(error = %e, "Anthropic backend unavailable, using glossary");
            Arc::new(GlossaryProposalSource::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credentials_uses_glossary() {
        let source = build_source(&ProposalConfig::default());
        assert_eq!(source.name(), "glossary");
    }

    #[test]
    fn test_api_key_uses_anthropic() {
        let config = ProposalConfig {
            anthropic_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        assert_eq!(build_source(&config).name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_gateway_with_custom_model() {
        let config = ProposalConfig {
            gateway: Some("http://gateway.local".to_string()),
            model: Some("claude-opus-4-1".to_string()),
            ..Default::default()
        };
        assert_eq!(build_source(&config).name(), "claude-opus-4-1");
    }
}
