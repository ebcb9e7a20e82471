//! Error types for immich-hass
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Remote, Media, Config, etc.)
//! - Context information (endpoint, HTTP status, file path, archive path)
//!
//! [`MediaError`]s only ever reach the per-file loop of the media pipeline, which
//! logs and skips the file. Every other variant aborts the current cycle.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for immich-hass operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for immich-hass
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues without a debugger.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "num_photos")
        key: Option<String>,
    },

    /// Request to the photo server failed
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Downloaded archive could not be parsed
    #[error("corrupt archive {archive}: {reason}")]
    CorruptArchive {
        /// The archive file (or in-memory label) that failed to parse
        archive: PathBuf,
        /// The reason parsing failed
        reason: String,
    },

    /// Per-file media processing error (conversion, unsupported type)
    #[error("media error: {0}")]
    Media(#[from] MediaError),

    /// Filesystem operation on the publish directory failed
    #[error("failed to {operation} {path}: {source}")]
    Filesystem {
        /// What was being attempted (e.g., "write archive", "read directory")
        operation: &'static str,
        /// The path the operation targeted
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Operation not supported (missing binary, disabled backend)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors returned by the photo server API surface
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, connect, TLS, timeout)
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// The API path that was called (e.g., "/api/search/random")
        endpoint: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        /// The API path that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated for logging
        body: String,
    },

    /// The server answered 2xx but the payload could not be understood
    #[error("unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        /// The API path that was called
        endpoint: String,
        /// What was wrong with the payload
        reason: String,
    },
}

impl RemoteError {
    /// The API path the failed request targeted
    pub fn endpoint(&self) -> &str {
        match self {
            RemoteError::Transport { endpoint, .. }
            | RemoteError::Status { endpoint, .. }
            | RemoteError::InvalidResponse { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            RemoteError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            RemoteError::InvalidResponse { .. } => None,
        }
    }
}

/// Per-file media errors (conversion and classification)
#[derive(Debug, Error)]
pub enum MediaError {
    /// Neither the still-image nor the video conversion succeeded
    #[error("conversion failed for {path}: {reason}")]
    ConversionFailed {
        /// The source file that could not be converted
        path: PathBuf,
        /// The reason conversion failed
        reason: String,
    },

    /// The file extension matches none of the known media classes
    #[error("unsupported file type {extension:?} for {path}")]
    UnsupportedFormat {
        /// The offending file
        path: PathBuf,
        /// The lowercase extension (empty when the file has none)
        extension: String,
    },
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Wrap an I/O error with the operation and path that produced it
    pub fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Machine-readable error code, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Remote(e) => match e {
                RemoteError::Transport { .. } => "remote_transport",
                RemoteError::Status { .. } => "remote_status",
                RemoteError::InvalidResponse { .. } => "remote_invalid_response",
            },
            Error::CorruptArchive { .. } => "corrupt_archive",
            Error::Media(e) => match e {
                MediaError::ConversionFailed { .. } => "conversion_failed",
                MediaError::UnsupportedFormat { .. } => "unsupported_format",
            },
            Error::Filesystem { .. } => "filesystem_error",
            Error::NotSupported(_) => "not_supported",
            Error::Other(_) => "internal_error",
        }
    }
}
