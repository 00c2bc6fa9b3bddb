//! Error taxonomy for the send pipeline
//!
//! Every stage returns a `SendError` instead of halting; the error knows its HTTP
//! status and carries a message fit for logs and default responses.

use hyper::StatusCode;
use std::io;

/// Failure raised before any header has been produced
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Malformed percent-encoding or an embedded null byte (400)
    #[error("bad request: {0}")]
    BadRequest(&'static str),

    /// Path escapes the root, dotfile forbidden, index disabled, or access denied (403)
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Missing file or index, hidden dotfile, or over-long path (404)
    #[error("not found")]
    NotFound,

    /// If-Match / If-Unmodified-Since did not hold (412)
    #[error("precondition failed")]
    PreconditionFailed,

    /// First byte position lies beyond the content window (416)
    #[error("range not satisfiable for {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    /// Unexpected I/O or response-building failure (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl SendError {
    /// HTTP status code this error maps to
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a filesystem failure to the outcome the caller should see
    ///
    /// Absent entries (including "not a directory" for `file.txt/x`) and names the
    /// OS refuses as too long become 404 so that existence is never leaked;
    /// permission problems become 403.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidFilename => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::Forbidden("permission denied"),
            _ => Self::Internal(err.to_string()),
        }
    }

    /// Whether this is a server-side failure worth logging at error level
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<hyper::http::Error> for SendError {
    fn from(err: hyper::http::Error) -> Self {
        Self::Internal(format!("failed to build response: {err}"))
    }
}

/// Terminal failure raised while the body is streaming
///
/// Headers are already final at this point, so the only thing left to do is
/// abort the response; the message says what went wrong and how far we got.
#[derive(Debug, thiserror::Error)]
#[error("{message} (after {bytes_sent} of {expected} bytes)")]
pub struct StreamError {
    pub message: String,
    pub bytes_sent: u64,
    pub expected: u64,
}
