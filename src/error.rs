//! Crate-wide error type.
//!
//! A flat `thiserror`-derived enum, one variant per distinguishable
//! failure, with `#[error(...)]` messages instead of a separate `Display`
//! impl.

use thiserror::Error;

/// Canonical status code a framing error implies, for the server path's
/// minimal error response (spec.md §4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    BadRequest,
    NotImplemented,
    HttpVersionNotSupported,
    InternalError,
}

impl ErrorStatus {
    /// Numeric HTTP status code.
    pub fn code(self) -> u16 {
        match self {
            ErrorStatus::BadRequest => 400,
            ErrorStatus::NotImplemented => 501,
            ErrorStatus::HttpVersionNotSupported => 505,
            ErrorStatus::InternalError => 500,
        }
    }

    /// Standard reason phrase for the error status.
    pub fn reason(self) -> &'static str {
        match self {
            ErrorStatus::BadRequest => "Bad Request",
            ErrorStatus::NotImplemented => "Not Implemented",
            ErrorStatus::HttpVersionNotSupported => "HTTP Version Not Supported",
            ErrorStatus::InternalError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // -- framing errors (spec.md §4.1, §7.1) --
    #[error("malformed request-line")]
    BadRequestLine,

    #[error("malformed status-line")]
    BadStatusLine,

    #[error("unsupported method")]
    UnsupportedMethod,

    #[error("unsupported HTTP major version")]
    UnsupportedVersion,

    #[error("malformed headers section")]
    BadHeaders,

    #[error("Content-Length value overflows u64")]
    ContentLengthOverflow,

    #[error("Content-Length value is not a decimal number")]
    BadContentLength,

    #[error("more than one Content-Length header")]
    DuplicateContentLength,

    #[error("request target could not be classified")]
    BadRequestTarget,

    // -- resource errors (spec.md §7.3) --
    #[error("app rx queue too small to hold control data")]
    AppRxQueueTooSmall,

    #[error("transport tx queue accepted fewer bytes than the formatted control data")]
    ShortTransportSend,

    // -- app protocol violations (spec.md §7.4) --
    #[error("app tx queue produced a handoff message of the wrong type")]
    UnexpectedMessageType,

    #[error("method/body-presence mismatch (GET with body, or POST without one)")]
    MethodBodyMismatch,

    #[error("invalid status code in reply handoff message")]
    InvalidStatusCode,

    // -- config (SPEC_FULL.md §11) --
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl Error {
    /// Map a framing/resource/protocol error to the status code the server
    /// path reports to the peer before closing (spec.md §4.1, §7).
    ///
    /// Protocol violations committed by the *application* (not the peer)
    /// have no wire representation and return `None` — nothing is sent,
    /// the app is notified directly (spec.md §7.4).
    pub fn status_code(self) -> Option<ErrorStatus> {
        use Error::*;
        Some(match self {
            BadRequestLine | BadHeaders | ContentLengthOverflow | BadContentLength
            | DuplicateContentLength | BadRequestTarget | BadStatusLine => ErrorStatus::BadRequest,
            UnsupportedMethod => ErrorStatus::NotImplemented,
            UnsupportedVersion => ErrorStatus::HttpVersionNotSupported,
            AppRxQueueTooSmall | ShortTransportSend => ErrorStatus::InternalError,
            UnexpectedMessageType | MethodBodyMismatch | InvalidStatusCode | InvalidConfig(_) => {
                return None
            }
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
