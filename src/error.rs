use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the crate's own plumbing: config files, CLI wiring, client setup.
#[derive(Error, Debug)]
pub enum MediaProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Load failed: {0}")]
    Load(ErrorValue),
}

pub type Result<T> = std::result::Result<T, MediaProviderError>;

/// Category of a failed load. Callers branch on this, never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The backend affirmatively reports that the asset does not exist.
    NotFound,
    /// Caller misconfiguration; no I/O was attempted.
    InvalidParams,
    /// Network or remote execution failed.
    TransportFailure,
    /// The session token step failed.
    SessionFailure,
    /// The response could not be mapped into a media entry.
    ParseFailure,
    /// The catalog refused playback of the asset (entitlement, geo, concurrency).
    AccessDenied,
    /// The load was canceled before it finished.
    Canceled,
    /// Fixture dataset load failure or anything unclassified.
    Generic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::InvalidParams => "InvalidParams",
            Self::TransportFailure => "TransportFailure",
            Self::SessionFailure => "SessionFailure",
            Self::ParseFailure => "ParseFailure",
            Self::AccessDenied => "AccessDenied",
            Self::Canceled => "Canceled",
            Self::Generic => "Generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured load error delivered inside a failed envelope.
///
/// Two values are equal when their kinds match; `message` and `code` are
/// diagnostics only.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
    /// Backend-specific error code, when the backend reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorValue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SessionFailure, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailure, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "load canceled")
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for ErrorValue {}

impl PartialEq<ErrorKind> for ErrorValue {
    fn eq(&self, other: &ErrorKind) -> bool {
        self.kind == *other
    }
}

impl From<ErrorValue> for MediaProviderError {
    fn from(error: ErrorValue) -> Self {
        MediaProviderError::Load(error)
    }
}
