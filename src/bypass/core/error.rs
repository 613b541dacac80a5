//! Error taxonomy shared by the session layer and every bypass strategy.

use std::time::Duration;

use thiserror::Error;

/// Failures raised while talking to a remote site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Unrecoverable outcome of a single bypass attempt.
///
/// Strategies return the first one they hit and never attach partial results.
#[derive(Debug, Error)]
pub enum BypassError {
    #[error("unsupported link: {0}")]
    UnsupportedLink(String),
    #[error("session error: {0}")]
    Session(String),
    #[error("token extraction failed: {0}")]
    TokenExtraction(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no links found")]
    NotFound,
}

impl BypassError {
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::TokenExtraction(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

impl From<url::ParseError> for BypassError {
    fn from(err: url::ParseError) -> Self {
        Self::UnsupportedLink(err.to_string())
    }
}

impl From<serde_json::Error> for BypassError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("invalid json payload: {err}"))
    }
}
