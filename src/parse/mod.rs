//! Byte-buffer parser (spec.md §4.1, component A).
//!
//! Everything here operates on `(buf, offset, limit, needle)` primitives
//! (see [`crate::util::find_from`]) rather than delegating to a generic
//! RFC-9112 parser: the target-form classification, the tolerance for
//! exactly one leading empty CRLF, and the case-sensitive Content-Length
//! match are specific enough that a general-purpose header parser doesn't
//! save anything (see `DESIGN.md` for the note on why `httparse` was
//! dropped from the dependency stack).

mod headers;
mod request_line;
mod status_line;

pub(crate) use headers::{parse_content_length, parse_headers_section, HeadersSection};
pub(crate) use request_line::{parse_request_line, ParsedRequestLine};
pub use request_line::TargetForm;
pub(crate) use status_line::{parse_status_line, ParsedStatusLine};

use crate::error::Error;

/// Method recognized by the request-line parser. spec.md §1 scopes parsing
/// to GET and POST only; anything else is a capability error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Match an uppercase token at the start of a request-line.
    ///
    /// Returns `Ok(Some(method))` for GET/POST, `Ok(None)` if the token
    /// looks like a method token we don't implement (spec.md §4.1 step 4:
    /// "Any other uppercase-initial token → NotImplemented"), and `Err` if
    /// it isn't a method token at all.
    pub(crate) fn classify(token: &[u8]) -> Result<Option<Method>, Error> {
        match token {
            b"GET" => Ok(Some(Method::Get)),
            b"POST" => Ok(Some(Method::Post)),
            _ => {
                // A token under 3 bytes can't be a real method name (the
                // shortest is "GET"/"PUT"), so it's treated as a malformed
                // request-line rather than a not-implemented method
                // (spec.md §8 scenario 4: "GE /x..." is 400, not 501).
                let starts_uppercase = token.first().is_some_and(u8::is_ascii_uppercase);
                let plausible_length = token.len() >= 3;
                if starts_uppercase && plausible_length && token.iter().all(|b| b.is_ascii_alphabetic()) {
                    Ok(None)
                } else {
                    Err(Error::BadRequestLine)
                }
            }
        }
    }
}
