//! Request-line parsing and request-target classification (spec.md §4.1
//! "Request-line parser" / "Target-form classification").

use crate::error::Error;
use crate::util::find_from;

use super::Method;

/// RFC 9112 classification of a request target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetForm {
    /// `*` — only valid for OPTIONS, which this crate does not implement,
    /// but the form is still classified so the method-gating error (§4.1
    /// step 4, NotImplemented) fires before target classification would.
    Asterisk,
    /// `/path?query` — the common case, leading `/` stripped.
    Origin,
    /// `scheme://authority/path?query`.
    Absolute,
    /// `host:port` (CONNECT-style); not reachable for GET/POST in practice
    /// but classified per spec.md's priority order regardless.
    Authority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRequestLine {
    pub method: Method,
    pub target_form: TargetForm,
    pub target_path_offset: usize,
    pub target_path_len: usize,
    pub target_query_offset: usize,
    pub target_query_len: usize,
    /// Offset of the first byte after the request-line's own CRLF — the
    /// `rx_buf_offset` spec.md §4.1 step 9 sets, where header parsing (or
    /// the blank-line check) begins.
    pub line_end: usize,
}

/// Parse a request-line from the start of `buf`.
///
/// Tolerates exactly one empty leading CRLF (RFC 9112 §2.2) before the
/// method token, per spec.md §4.1 step 3.
pub(crate) fn parse_request_line(buf: &[u8]) -> Result<ParsedRequestLine, Error> {
    // Step 3: tolerate exactly one empty leading CRLF.
    let method_offset = if buf.len() >= 2 && &buf[0..2] == b"\r\n" {
        2
    } else {
        0
    };

    // Step 1: locate first CRLF (of the actual request-line, i.e. after any
    // tolerated leading blank line). Its index defines control_data_len
    // (inclusive of the CRLF).
    let crlf = find_from(buf, method_offset, 0, b"\r\n").ok_or(Error::BadRequestLine)?;
    let line_end = crlf + 2;

    // Step 2: require at least one further CRLF later in buf (headers
    // terminator or the bare blank line after a headerless request).
    if find_from(buf, line_end, 0, b"\r\n").is_none() {
        return Err(Error::BadRequestLine);
    }

    // Step 4: the method token, up to the next space.
    let space_after_method =
        find_from(buf, method_offset, crlf - method_offset, b" ").ok_or(Error::BadRequestLine)?;
    let method_token = &buf[method_offset..space_after_method];
    let method = match Method::classify(method_token)? {
        Some(m) => m,
        None => return Err(Error::UnsupportedMethod),
    };

    let target_path_offset = space_after_method + 1;

    // Step 5: locate " HTTP/" at control_data_len - 11 (an 11-byte window:
    // " HTTP/1.1\r\n").
    if line_end < 11 {
        return Err(Error::BadRequestLine);
    }
    let window_start = line_end - 11;
    let http_marker = find_from(buf, window_start, 11, b" HTTP/").ok_or(Error::BadRequestLine)?;

    // Step 7: target path length must be >= 1.
    if http_marker <= target_path_offset {
        return Err(Error::BadRequestLine);
    }
    let target_path_len = http_marker - target_path_offset;

    // Step 6: byte at +6 from the " HTTP/" match is the major version digit.
    let major_idx = http_marker + 6;
    let major = *buf.get(major_idx).ok_or(Error::BadRequestLine)?;
    if !major.is_ascii_digit() {
        return Err(Error::BadRequestLine);
    }
    if major != b'1' {
        return Err(Error::UnsupportedVersion);
    }

    // Step 8: classify target form (may adjust path offset/len to strip the
    // query string or the leading '/').
    let (target_form, target_path_offset, target_path_len, target_query_offset, target_query_len) =
        classify_target(buf, target_path_offset, target_path_len)?;

    Ok(ParsedRequestLine {
        method,
        target_form,
        target_path_offset,
        target_path_len,
        target_query_offset,
        target_query_len,
        line_end,
    })
}

/// Classify the request target and split off an optional query string.
///
/// Priority order per spec.md §4.1: asterisk, origin, absolute, authority.
/// A target matching more than one pattern is classified by this priority.
fn classify_target(
    buf: &[u8],
    offset: usize,
    len: usize,
) -> Result<(TargetForm, usize, usize, usize, usize), Error> {
    if len == 0 {
        return Err(Error::BadRequestTarget);
    }

    if len == 1 && buf[offset] == b'*' {
        return Ok((TargetForm::Asterisk, offset, len, 0, 0));
    }

    if buf[offset] == b'/' {
        let (path_offset, path_len) = (offset + 1, len - 1);
        let (path_len, query_offset, query_len) = split_query(buf, path_offset, path_len);
        return Ok((TargetForm::Origin, path_offset, path_len, query_offset, query_len));
    }

    if find_from(buf, offset, len, b"://").is_some() {
        let (path_len, query_offset, query_len) = split_query(buf, offset, len);
        return Ok((TargetForm::Absolute, offset, path_len, query_offset, query_len));
    }

    if has_colon_then_digit(&buf[offset..offset + len]) {
        return Ok((TargetForm::Authority, offset, len, 0, 0));
    }

    Err(Error::BadRequestTarget)
}

/// Split `buf[offset..offset+len]` at the first `?`, if any. Returns
/// `(path_len, query_offset, query_len)`; `query_len == 0` when there is no
/// query string (in which case `query_offset` is meaningless and set to 0).
fn split_query(buf: &[u8], offset: usize, len: usize) -> (usize, usize, usize) {
    match find_from(buf, offset, len, b"?") {
        Some(q) => {
            let path_len = q - offset;
            let query_offset = q + 1;
            let query_len = (offset + len) - query_offset;
            (path_len, query_offset, query_len)
        }
        None => (len, 0, 0),
    }
}

fn has_colon_then_digit(region: &[u8]) -> bool {
    region
        .iter()
        .zip(region.iter().skip(1))
        .any(|(c, next)| *c == b':' && next.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_simple_get() {
        let r = parse_request_line(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(r.method, Method::Get);
        assert_eq!(r.target_form, TargetForm::Origin);
        assert_eq!(&b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n"[r.target_path_offset..r.target_path_offset + r.target_path_len], b"hello");
        assert_eq!(r.target_query_len, 0);
    }

    #[test]
    fn parses_post_with_query() {
        let input = b"POST /api/v1/x?q=1&r=2 HTTP/1.1\r\n\r\n";
        let r = parse_request_line(input).unwrap();
        assert_eq!(r.method, Method::Post);
        assert_eq!(&input[r.target_path_offset..r.target_path_offset + r.target_path_len], b"api/v1/x");
        assert_eq!(&input[r.target_query_offset..r.target_query_offset + r.target_query_len], b"q=1&r=2");
    }

    #[test]
    fn tolerates_one_leading_empty_crlf() {
        let input = b"\r\nGET / HTTP/1.1\r\n\r\n";
        let r = parse_request_line(input).unwrap();
        assert_eq!(r.method, Method::Get);
    }

    #[test]
    fn asterisk_form() {
        // OPTIONS is not implemented, so method gating fires first.
        let err = parse_request_line(b"OPTIONS * HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err, Error::UnsupportedMethod);
    }

    #[test]
    fn bad_method_token() {
        let err = parse_request_line(b"GE /x HTTP/1.1\r\n\r\n").unwrap_err();
        assert_eq!(err, Error::BadRequestLine);
    }

    #[test]
    fn unsupported_version_major() {
        let err = parse_request_line(b"GET / HTTP/2.0\r\n\r\n").unwrap_err();
        assert_eq!(err, Error::UnsupportedVersion);
    }

    #[test]
    fn missing_second_crlf() {
        let err = parse_request_line(b"GET / HTTP/1.1\r\n").unwrap_err();
        assert_eq!(err, Error::BadRequestLine);
    }

    #[test]
    fn absolute_form() {
        let input = b"GET http://example.com/path?x=1 HTTP/1.1\r\n\r\n";
        let r = parse_request_line(input).unwrap();
        assert_eq!(r.target_form, TargetForm::Absolute);
        assert_eq!(&input[r.target_path_offset..r.target_path_offset + r.target_path_len], b"http://example.com/path");
    }

    #[test]
    fn authority_form() {
        let input = b"GET example.com:443 HTTP/1.1\r\n\r\n";
        let r = parse_request_line(input).unwrap();
        assert_eq!(r.target_form, TargetForm::Authority);
    }
}
