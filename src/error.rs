// Error taxonomy shared by the library modules.
// - `ConfigError` is fatal and raised before any upload is attempted.
// - `UploadError` belongs to a single file and ends up inside its outcome.
// - `ReportError` is raised after the batch, when the report can't be saved.

use std::io;
use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::config::Credential;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Raised when credentials are still unset once every source was consulted.
    #[error(
        "Cloudinary credentials not found in arguments, config file, or environment variables (missing: {})",
        .missing.iter().join(", ")
    )]
    MissingCredentials { missing: Vec<Credential> },
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a single file. Never aborts the batch.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),
    #[error("file is {size} bytes, larger than the {limit} bytes limit")]
    TooLarge { size: u64, limit: u64 },
    #[error("file type {mime} is not allowed")]
    UnsupportedType { mime: String },
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("upload rejected ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        kind: UploadErrorKind,
    },
    #[error("upload timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed upload response: {0}")]
    MalformedResponse(String),
}

/// Copyable discriminant of an [`UploadError`], kept in the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    Io,
    SizeLimit,
    UnsupportedType,
    Auth,
    Remote,
    Timeout,
    Transport,
    MalformedResponse,
}

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::Io(_) => UploadErrorKind::Io,
            UploadError::TooLarge { .. } => UploadErrorKind::SizeLimit,
            UploadError::UnsupportedType { .. } => UploadErrorKind::UnsupportedType,
            UploadError::Auth(_) => UploadErrorKind::Auth,
            UploadError::Rejected { kind, .. } => *kind,
            UploadError::Timeout => UploadErrorKind::Timeout,
            UploadError::Transport(_) => UploadErrorKind::Transport,
            UploadError::MalformedResponse(_) => UploadErrorKind::MalformedResponse,
        }
    }

    /// Map a non-success HTTP answer of the upload endpoint.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => UploadError::Auth(message),
            413 => UploadError::Rejected {
                status,
                message,
                kind: UploadErrorKind::SizeLimit,
            },
            400 if message.to_lowercase().contains("too large") => UploadError::Rejected {
                status,
                message,
                kind: UploadErrorKind::SizeLimit,
            },
            400 if is_unsupported_type(&message) => UploadError::Rejected {
                status,
                message,
                kind: UploadErrorKind::UnsupportedType,
            },
            _ => UploadError::Rejected {
                status,
                message,
                kind: UploadErrorKind::Remote,
            },
        }
    }
}

fn is_unsupported_type(message: &str) -> bool {
    let message = message.to_lowercase();
    ["invalid image file", "invalid video file", "unsupported"]
        .iter()
        .any(|needle| message.contains(needle))
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::Timeout
        } else if err.is_decode() {
            UploadError::MalformedResponse(err.to_string())
        } else {
            UploadError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
