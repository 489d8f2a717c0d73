//! Status-line parsing (spec.md §4.1 "Status-line parser", client/proxy
//! reply path).

use crate::error::Error;
use crate::status;
use crate::util::{find_from, parse_u64_decimal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedStatusLine {
    pub status_code: u16,
    pub reason_offset: usize,
    pub reason_len: usize,
    /// Offset of the first byte after the status-line's own CRLF.
    pub line_end: usize,
}

/// Parse a status-line: `HTTP/1.x SP 3DIGIT SP reason-phrase CRLF`.
///
/// The major version digit must be `1`; the reason phrase may be empty.
pub(crate) fn parse_status_line(buf: &[u8]) -> Result<ParsedStatusLine, Error> {
    const PREFIX: &[u8] = b"HTTP/1.";

    if buf.len() < PREFIX.len() + 1 || &buf[..PREFIX.len()] != PREFIX {
        return Err(Error::BadStatusLine);
    }

    let minor = buf[PREFIX.len()];
    if !minor.is_ascii_digit() {
        return Err(Error::BadStatusLine);
    }

    // One or more spaces separate the version from the status code.
    let mut i = PREFIX.len() + 1;
    if buf.get(i) != Some(&b' ') {
        return Err(Error::BadStatusLine);
    }
    while buf.get(i) == Some(&b' ') {
        i += 1;
    }

    let code_bytes = buf.get(i..i + 3).ok_or(Error::BadStatusLine)?;
    if !code_bytes.iter().all(u8::is_ascii_digit) {
        return Err(Error::BadStatusLine);
    }
    let status_code = parse_u64_decimal(code_bytes).ok_or(Error::BadStatusLine)? as u16;
    if !status::is_valid(status_code) {
        return Err(Error::BadStatusLine);
    }
    i += 3;

    // A single space separates the code from the reason phrase; a
    // zero-length reason phrase (bare CRLF right after the code) is legal.
    let reason_offset = match buf.get(i) {
        Some(b' ') => i + 1,
        Some(b'\r') => i,
        _ => return Err(Error::BadStatusLine),
    };

    let crlf = find_from(buf, reason_offset, 0, b"\r\n").ok_or(Error::BadStatusLine)?;
    let reason_len = crlf - reason_offset;
    let line_end = crlf + 2;

    Ok(ParsedStatusLine {
        status_code,
        reason_offset,
        reason_len,
        line_end,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_ok() {
        let r = parse_status_line(b"HTTP/1.1 200 OK\r\n").unwrap();
        assert_eq!(r.status_code, 200);
        assert_eq!(r.line_end, 18);
    }

    #[test]
    fn empty_reason_phrase_allowed() {
        let r = parse_status_line(b"HTTP/1.1 204 \r\n").unwrap();
        assert_eq!(r.status_code, 204);
        assert_eq!(r.reason_len, 0);
    }

    #[test]
    fn rejects_bad_prefix() {
        assert_eq!(
            parse_status_line(b"HTTP/2.0 200 OK\r\n").unwrap_err(),
            Error::BadStatusLine
        );
    }

    #[test]
    fn rejects_out_of_range_code() {
        assert_eq!(
            parse_status_line(b"HTTP/1.1 099 OK\r\n").unwrap_err(),
            Error::BadStatusLine
        );
    }

    #[test]
    fn unrecognized_code_still_parses() {
        // Bucketing happens downstream; the status-line parser accepts any
        // in-range three-digit code (spec.md §8 scenario 7).
        let r = parse_status_line(b"HTTP/1.1 299 Weird\r\n").unwrap();
        assert_eq!(r.status_code, 299);
    }
}
