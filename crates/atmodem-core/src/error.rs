//! Error types for atmodem.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Every failure is local to the command
//! that caused it: the dispatch engine survives any of these and moves on
//! to the next queued command.

use std::fmt;

/// The vendor error class reported by the modem.
///
/// GSM modems report equipment errors as `+CME ERROR: <code>` and
/// SMS-service errors as `+CMS ERROR: <code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Mobile equipment error (`+CME ERROR`).
    Cme,
    /// SMS service error (`+CMS ERROR`).
    Cms,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Cme => write!(f, "CME"),
            ErrorClass::Cms => write!(f, "CMS"),
        }
    }
}

/// The error type for all atmodem operations.
///
/// Variants cover the full range of failure modes for one command/response
/// exchange: transport write/drain failures, timeouts, replies that do not
/// match the expected pattern, classified vendor error frames, and
/// post-processing rejections. Variants that reject a reply carry the raw
/// response lines in `data` so callers can inspect what was actually
/// received.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (failed to open or configure the port).
    #[error("transport error: {0}")]
    Transport(String),

    /// Writing the command bytes to the transport failed.
    #[error("write failed: {0}")]
    WriteFailure(String),

    /// Flushing the transport after a successful write failed.
    #[error("drain failed: {0}")]
    DrainFailure(String),

    /// Timed out waiting for a response from the modem.
    ///
    /// This typically indicates the modem is powered off, the baud rate is
    /// wrong, or the command is not supported and produced no reply at all.
    #[error("timeout waiting for response")]
    Timeout,

    /// The reply did not match the command's expected pattern and carried
    /// no recognizable vendor error code.
    #[error("{message}")]
    PatternMismatch {
        /// Human-readable mismatch description embedding the raw reply.
        message: String,
        /// The raw response lines as received.
        data: Vec<String>,
    },

    /// The modem reported a classified `+CME ERROR` or `+CMS ERROR` frame.
    #[error("+{class} ERROR {code}: {message}")]
    VendorError {
        /// Whether this was a CME or CMS error frame.
        class: ErrorClass,
        /// The numeric code as reported by the modem.
        code: String,
        /// The human-readable description from the static lookup table.
        message: String,
        /// The raw response lines as received.
        data: Vec<String>,
    },

    /// The reply matched the expected pattern but the post-processing
    /// transform determined it was semantically invalid (e.g. the modem is
    /// still searching for a network).
    #[error("{message}")]
    TransformRejected {
        /// The transform's rejection reason.
        message: String,
        /// The raw response lines as received.
        data: Vec<String>,
    },

    /// No connection to the modem has been established, or the engine has
    /// shut down.
    #[error("not connected")]
    NotConnected,

    /// The connection to the modem was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The raw response lines carried by reply-rejecting variants, if any.
    pub fn data(&self) -> Option<&[String]> {
        match self {
            Error::PatternMismatch { data, .. }
            | Error::VendorError { data, .. }
            | Error::TransformRejected { data, .. } => Some(data),
            _ => None,
        }
    }

    /// The classified vendor error code, if this is a [`Error::VendorError`].
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::VendorError { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
