//! Error types for the classkit core crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all classkit operations.
#[derive(Debug, Error)]
pub enum ClasskitError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("invalid course: {0}")]
    InvalidCourse(String),

    #[error("Classroom API error ({status}): {message}")]
    Remote {
        status: u16,
        kind: RemoteErrorKind,
        message: String,
    },
}

/// Coarse error taxonomy used when deciding whether a run can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The roster file could not be parsed. Fatal, raised before any remote call.
    MalformedInput,
    /// Credentials could not be obtained or were rejected. Fatal.
    AuthError,
    /// The target course does not resolve. Fatal.
    InvalidCourse,
    /// A single remote call was rejected. Recovered per record.
    RemoteError,
    /// Local failures outside a run (config, filesystem, encoding).
    Local,
}

/// Refinement of a rejected remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    InvalidIdentifier,
    PermissionDenied,
    NotFound,
    RateLimited,
    Unavailable,
    Other,
}

impl RemoteErrorKind {
    /// Classify an HTTP status code plus the optional Google `error.status` string.
    pub fn from_status(status: u16, google_status: Option<&str>) -> Self {
        if google_status == Some("RESOURCE_EXHAUSTED") {
            return Self::RateLimited;
        }
        match status {
            400 => Self::InvalidIdentifier,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidIdentifier => "invalid identifier",
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::RateLimited => "rate limited",
            Self::Unavailable => "service unavailable",
            Self::Other => "remote error",
        };
        f.write_str(s)
    }
}

impl ClasskitError {
    /// Map this error onto the run-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::Auth(_) => ErrorKind::AuthError,
            Self::InvalidCourse(_) => ErrorKind::InvalidCourse,
            Self::Remote { .. } | Self::Http(_) => ErrorKind::RemoteError,
            Self::Config(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Local,
        }
    }

    /// True when the error must abandon a synchronisation run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MalformedInput | ErrorKind::AuthError | ErrorKind::InvalidCourse
        )
    }

    /// The remote refinement and provider message for a per-record failure.
    ///
    /// Transport errors are reported as [`RemoteErrorKind::Unavailable`].
    pub fn remote_parts(&self) -> (RemoteErrorKind, String) {
        match self {
            Self::Remote { kind, message, .. } => (*kind, message.clone()),
            Self::Http(e) => (RemoteErrorKind::Unavailable, e.to_string()),
            other => (RemoteErrorKind::Other, other.to_string()),
        }
    }
}

/// A convenience Result alias that defaults to [`ClasskitError`].
pub type Result<T> = std::result::Result<T, ClasskitError>;
