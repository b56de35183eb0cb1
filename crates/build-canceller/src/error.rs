//! Error types for the build cancellation sweep.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while sweeping a namespace.
#[derive(Error, Debug)]
pub enum CancellerError {
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A base URL or resource path could not be turned into a URL.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// No response arrived within the per-call window.
    #[error("Request to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    /// Lower-level transport fault (connection refused, TLS failure, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response decoded but lacks a field the sweep needs.
    #[error("Malformed build document: {0}")]
    MissingField(String),
}

/// Coarse failure taxonomy surfaced to callers of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed base URL, resource path or settings.
    Config,
    /// Timeout, connection/TLS fault or refused call.
    Transport,
    /// Undecodable response body.
    Parse,
}

impl CancellerError {
    /// Map this error onto the coarse [`ErrorKind`] taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidUrl { .. } => ErrorKind::Config,
            Self::Timeout { .. } | Self::Http(_) | Self::Api { .. } => ErrorKind::Transport,
            Self::Parse(_) | Self::MissingField(_) => ErrorKind::Parse,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Transport => write!(f, "transport"),
            Self::Parse => write!(f, "parse"),
        }
    }
}
