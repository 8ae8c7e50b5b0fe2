//! Error types for Chapterwatch.
//!
//! Uses `thiserror` for structured error definitions. Every adapter and
//! engine failure flows through [`SiteError`]; configuration problems use
//! [`ConfigError`].

use thiserror::Error;

/// Uniform error channel for site adapters and the resolution engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SiteError {
    /// Network failure, connection reset or transport timeout
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Markup did not have the expected shape
    #[error("Failed to parse page: {0}")]
    Parse(String),

    /// No adapter or no title matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested URL is an alias; resolution must continue at `target`
    #[error("Redirected to {target}")]
    Redirect { target: String },

    /// Search race lost against the timeout
    #[error("Timed out")]
    Timeout,

    /// Upstream returned a malformed payload
    #[error("Invalid response: {0}")]
    Invalid(String),

    /// The redirect chain exceeded the configured bound
    #[error("Too many redirects (last target: {0})")]
    TooManyRedirects(String),
}

impl SiteError {
    /// Returns the redirect target if this error is a redirect signal.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            SiteError::Redirect { target } => Some(target),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(err: reqwest::Error) -> Self {
        SiteError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SiteError {
    fn from(err: serde_json::Error) -> Self {
        SiteError::Invalid(err.to_string())
    }
}

/// Error type for configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Config directory not found
    #[error("Could not determine config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_target() {
        let err = SiteError::Redirect {
            target: "https://skscans.com/manga/x/".to_string(),
        };
        assert_eq!(err.redirect_target(), Some("https://skscans.com/manga/x/"));

        let err = SiteError::Parse("missing title".to_string());
        assert_eq!(err.redirect_target(), None);
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(SiteError::Timeout.to_string(), "Timed out");
    }
}
