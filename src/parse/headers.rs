//! Headers-section delimiting and Content-Length extraction (spec.md §4.1
//! "Headers section" / "Content-Length extraction").

use crate::error::Error;
use crate::util::{find_from, parse_u64_decimal, trim_ascii_whitespace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadersSection {
    pub offset: usize,
    pub len: usize,
    /// First byte of the message body (or of the next message, if bodyless).
    pub body_offset: usize,
}

/// Delimit the headers section starting at `offset` (the request- or
/// status-line's `rx_buf_offset`).
///
/// If the bytes at `offset` are a bare CRLF, there are no headers and
/// `len == 0`. Otherwise the section runs up to (not including) the blank
/// line CRLFCRLF that terminates it.
pub(crate) fn parse_headers_section(buf: &[u8], offset: usize) -> Result<HeadersSection, Error> {
    if buf.get(offset..offset + 2) == Some(b"\r\n") {
        return Ok(HeadersSection {
            offset,
            len: 0,
            body_offset: offset + 2,
        });
    }

    let terminator = find_from(buf, offset, 0, b"\r\n\r\n").ok_or(Error::BadHeaders)?;
    let len = terminator - offset;
    Ok(HeadersSection {
        offset,
        len,
        body_offset: terminator + 4,
    })
}

/// Extract the Content-Length value from a delimited headers section.
///
/// Matches `Content-Length:` case-sensitively (spec.md §4.1: the match is
/// exact-case, not a case-insensitive header-name comparison as RFC 9110
/// technically requires — see `DESIGN.md` Open Question 1). Returns `Ok(None)`
/// if the header is absent, and errors on a duplicate, non-decimal, or
/// overflowing value.
pub(crate) fn parse_content_length(buf: &[u8], section: HeadersSection) -> Result<Option<u64>, Error> {
    const NAME: &[u8] = b"Content-Length:";

    if section.len == 0 {
        return Ok(None);
    }

    let mut cursor = section.offset;
    let end = section.offset + section.len;
    let mut found: Option<u64> = None;

    while cursor < end {
        let line_end = find_from(buf, cursor, end - cursor, b"\r\n").unwrap_or(end);
        let line = &buf[cursor..line_end];

        if line.len() >= NAME.len() && &line[..NAME.len()] == NAME {
            if found.is_some() {
                return Err(Error::DuplicateContentLength);
            }
            let value = trim_ascii_whitespace(&line[NAME.len()..]);
            let parsed = parse_u64_decimal(value).ok_or(Error::BadContentLength)?;
            found = Some(parsed);
        }

        cursor = line_end + 2;
    }

    Ok(found)
}
