//! Session bootstrap
//!
//! Resolves where a session's base document comes from into its text. This
//! runs once per session; the document is never re-fetched.

use base64::Engine;
use std::path::PathBuf;
use thiserror::Error;

/// Where to load a base document from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocator {
    Url(String),
    Path(PathBuf),
    /// Document text supplied directly
    Inline(String),
    /// Uploaded file, base64-encoded
    Base64(String),
}

impl DocumentLocator {
    /// Interpret a configuration value: `http(s)://` is a URL, `inline:` and
    /// `base64:` prefixes carry the document itself, anything else is a path
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else if let Some(text) = value.strip_prefix("inline:") {
            Self::Inline(text.to_string())
        } else if let Some(encoded) = value.strip_prefix("base64:") {
            Self::Base64(encoded.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }

    /// Short description for logs; never includes document content
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
            Self::Inline(text) => format!("inline ({} bytes)", text.len()),
            Self::Base64(encoded) => format!("upload ({} encoded bytes)", encoded.len()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Upload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Document is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
    #[error("Document is empty")]
    Empty,
}

/// Load the document text a locator points at
pub async fn resolve(
    locator: &DocumentLocator,
    client: &reqwest::Client,
) -> Result<String, BootstrapError> {
    let text = match locator {
        DocumentLocator::Url(url) => fetch(url, client).await?,
        DocumentLocator::Path(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| BootstrapError::Read {
                    path: path.display().to_string(),
                    source,
                })?
        }
        DocumentLocator::Inline(text) => text.clone(),
        DocumentLocator::Base64(encoded) => {
            let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
            String::from_utf8(bytes)?
        }
    };

    if text.trim().is_empty() {
        return Err(BootstrapError::Empty);
    }

    tracing::info!(
        source = %locator.describe(),
        bytes = text.len(),
        "Loaded base document"
    );
    Ok(text)
}

async fn fetch(url: &str, client: &reqwest::Client) -> Result<String, BootstrapError> {
    let fetch_error = |source| BootstrapError::Fetch {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(fetch_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(BootstrapError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().await.map_err(fetch_error)
}
