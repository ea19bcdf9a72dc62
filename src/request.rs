//! Request-line and header-field parsing over a raw, already-buffered
//! header (see `header.rs`). The parse is a single left-to-right scan, as
//! in the original; it never mutates the buffer it is given.

use crate::status::Status;

/// Upper bound on the decoded request-target, matching the original's
/// `PATH_MAX`.
pub const PATH_MAX: usize = 4096;

/// Upper bound on a single recognized header field's value, matching the
/// original's `FIELD_MAX`.
pub const FIELD_MAX: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
}

impl Method {
    fn from_prefix(line: &[u8]) -> Option<(Method, usize)> {
        if line.starts_with(b"GET ") {
            Some((Method::Get, 3))
        } else if line.starts_with(b"HEAD ") {
            Some((Method::Head, 4))
        } else {
            None
        }
    }
}

/// The small closed set of header fields this proxy recognizes by name.
/// Only `Host` is read downstream; `Range` and `If-Modified-Since` are
/// recognized (and bounds-checked) purely so an unrecognized-name line and
/// a recognized-but-unused one are handled by the same code path, matching
/// `enum req_field` in the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Host,
    Range,
    IfModifiedSince,
}

const KNOWN_FIELDS: [(&[u8], Field); 3] = [
    (b"Host", Field::Host),
    (b"Range", Field::Range),
    (b"If-Modified-Since", Field::IfModifiedSince),
];

/// A parsed request. `target` and the recognized field values are owned raw
/// byte buffers bounded to `PATH_MAX`/`FIELD_MAX` bytes respectively (the
/// original's fixed `char[PATH_MAX]`/`char[FIELD_MAX]` arrays, translated to
/// owned buffers since each worker here is its own thread with its own
/// stack already). These are `Vec<u8>`, not `String`: a percent-decoded
/// target can contain any byte (including ones ≥ 0x80), and a `Host` value
/// is never percent-decoded at all, so it can likewise carry a raw byte the
/// wire permits but UTF-8 doesn't — lossily converting either to `String`
/// would corrupt the access log and could make a legal `Host` value fail to
/// route.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub target: Vec<u8>,
    pub host: Option<Vec<u8>>,
    pub range: Option<Vec<u8>>,
    pub if_modified_since: Option<Vec<u8>>,
}

/// Parses a complete, `CRLFCRLF`-terminated header buffer.
///
/// Returns the rejecting [`Status`] if the request is malformed; the
/// caller is responsible for writing that status to the client (see
/// `status::send_status`) and logging it. A non-`Ok` return here always
/// means nothing has been written to the wire yet.
pub fn parse_request(buf: &[u8]) -> Result<Request, Status> {
    let (method, method_len) = Method::from_prefix(buf).ok_or(Status::MethodNotAllowed)?;

    // a single space must follow the method
    if buf.get(method_len) != Some(&b' ') {
        return Err(Status::BadRequest);
    }
    let mut p = method_len + 1;

    // TARGET: everything up to the next single space
    let target_end = find_byte(buf, p, b' ').ok_or(Status::BadRequest)?;
    let raw_target = &buf[p..target_end];
    if raw_target.len() + 1 > PATH_MAX {
        return Err(Status::RequestTooLarge);
    }
    let target = percent_decode(raw_target);
    p = target_end + 1;

    // HTTP-VERSION
    if !buf[p..].starts_with(b"HTTP/") {
        return Err(Status::BadRequest);
    }
    p += b"HTTP/".len();
    if buf[p..].starts_with(b"1.0") || buf[p..].starts_with(b"1.1") {
        p += "1.*".len();
    } else {
        return Err(Status::VersionNotSupported);
    }
    if !buf[p..].starts_with(b"\r\n") {
        return Err(Status::BadRequest);
    }
    p += 2;

    // HEADER FIELDS, until the terminating CRLF line (an empty line) or
    // the byte range runs out.
    let mut host = None;
    let mut range = None;
    let mut if_modified_since = None;

    while p < buf.len() && !buf[p..].starts_with(b"\r\n") {
        let matched = KNOWN_FIELDS
            .iter()
            .find(|(name, _)| matches_field_name(&buf[p..], name));

        let line_end = find_crlf(buf, p).ok_or(Status::BadRequest)?;

        let Some((name, field)) = matched else {
            p = line_end + 2;
            continue;
        };

        let mut q = p + name.len();
        // A matched name only counts if a colon immediately follows it (no
        // leading whitespace tolerated before the colon); otherwise this
        // isn't really the known field after all (e.g. `Hostname:` must
        // not be mistaken for `Host:` — see spec.md's design note on the
        // original's unterminated-name `strncasecmp` bug) and the line is
        // skipped like any other unrecognized field.
        if buf.get(q) != Some(&b':') {
            p = line_end + 2;
            continue;
        }
        q += 1;
        while matches!(buf.get(q), Some(b' ') | Some(b'\t')) {
            q += 1;
        }
        let value_end = find_crlf(buf, q).ok_or(Status::BadRequest)?;
        if value_end - q + 1 > FIELD_MAX {
            return Err(Status::RequestTooLarge);
        }
        let value = trim_trailing_ws(&buf[q..value_end]).to_vec();
        match field {
            Field::Host => host = Some(value),
            Field::Range => range = Some(value),
            Field::IfModifiedSince => if_modified_since = Some(value),
        }

        p = value_end + 2;
    }

    // Reaching the end of the buffer without the terminating blank line
    // means the header was cut off mid-field rather than properly closed.
    if !buf[p..].starts_with(b"\r\n") {
        return Err(Status::BadRequest);
    }

    Ok(Request {
        method,
        target,
        host,
        range,
        if_modified_since,
    })
}

fn matches_field_name(line: &[u8], name: &[u8]) -> bool {
    line.len() >= name.len() && line[..name.len()].eq_ignore_ascii_case(name)
}

fn find_byte(buf: &[u8], from: usize, needle: u8) -> Option<usize> {
    memchr::memchr(needle, &buf[from..]).map(|i| from + i)
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    memchr::memmem::find(&buf[from..], b"\r\n").map(|i| from + i)
}

fn trim_trailing_ws(mut s: &[u8]) -> &[u8] {
    while let Some((&last, rest)) = s.split_last() {
        if last == b' ' || last == b'\t' {
            s = rest;
        } else {
            break;
        }
    }
    s
}

/// `+` -> space, `%HH` -> the byte `0xHH`, any other `%` sequence copied
/// literally. Source and destination alias in the original (in-place
/// decode); here the destination is freshly allocated but the algorithm is
/// identical. Returns raw bytes rather than a `String`: a decoded `%HH` can
/// be any byte, including ones that aren't valid UTF-8 on their own, and
/// this must be a true left-inverse of percent-encoding rather than a lossy
/// approximation of one.
pub fn percent_decode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        match src[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < src.len() && is_hex(src[i + 1]) && is_hex(src[i + 2]) => {
                let hi = hex_val(src[i + 1]);
                let lo = hex_val(src[i + 2]);
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_get() {
        let req = parse_request(b"GET / HTTP/1.1\r\nHost: www.example.com\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.target, b"/".to_vec());
        assert_eq!(req.host.as_deref(), Some(&b"www.example.com"[..]));
    }

    #[test]
    fn head_is_accepted() {
        let req = parse_request(b"HEAD /x HTTP/1.0\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::Head);
    }

    #[test]
    fn post_is_rejected_405() {
        let err = parse_request(b"POST / HTTP/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(err, Status::MethodNotAllowed);
    }

    #[test]
    fn bad_version_is_505() {
        let err = parse_request(b"GET / HTTP/2.0\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(err, Status::VersionNotSupported);
    }

    #[test]
    fn missing_http_prefix_is_400() {
        let err = parse_request(b"GET / FOO/1.1\r\nHost: h\r\n\r\n").unwrap_err();
        assert_eq!(err, Status::BadRequest);
    }

    #[test]
    fn unknown_field_name_is_skipped() {
        let req = parse_request(
            b"GET / HTTP/1.1\r\nX-Nonsense: whatever\r\nHost: h\r\n\r\n",
        )
        .unwrap();
        assert_eq!(req.host.as_deref(), Some(&b"h"[..]));
    }

    #[test]
    fn hostname_like_prefix_does_not_match_host() {
        // `Hostname:` must not be mistaken for `Host:` (spec.md design
        // note on the original's unterminated-name `strncasecmp` bug).
        let req = parse_request(b"GET / HTTP/1.1\r\nHostname: evil\r\nHost: real\r\n\r\n").unwrap();
        assert_eq!(req.host.as_deref(), Some(&b"real"[..]));
    }

    #[test]
    fn missing_host_is_none_not_error() {
        let req = parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.host.is_none());
    }

    #[test]
    fn percent_decoded_target_is_logged() {
        let req = parse_request(b"GET /%2fetc HTTP/1.0\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(req.target, b"//etc".to_vec());
    }

    #[test]
    fn percent_decoding_non_ascii_byte_is_not_lossy() {
        // %E9 is not valid UTF-8 on its own; a lossy String conversion would
        // replace it with a 3-byte U+FFFD sequence instead of the raw byte.
        let req = parse_request(b"GET /%E9 HTTP/1.0\r\nHost: h\r\n\r\n").unwrap();
        assert_eq!(req.target, vec![b'/', 0xE9]);
    }

    #[test]
    fn plus_decodes_to_space() {
        assert_eq!(percent_decode(b"a+b"), b"a b".to_vec());
    }

    #[test]
    fn invalid_percent_sequence_is_copied_literally() {
        assert_eq!(percent_decode(b"100%"), b"100%".to_vec());
        assert_eq!(percent_decode(b"100%zz"), b"100%zz".to_vec());
    }

    #[test]
    fn field_value_trims_trailing_whitespace() {
        let req = parse_request(b"GET / HTTP/1.1\r\nHost: h   \r\n\r\n").unwrap();
        assert_eq!(req.host.as_deref(), Some(&b"h"[..]));
    }

    #[test]
    fn host_value_with_high_byte_is_preserved_raw() {
        // A Host value is never percent-decoded, but the wire still permits
        // a raw byte >= 0x80; it must reach the matcher untouched rather
        // than being mangled by a lossy UTF-8 conversion.
        let req = parse_request(b"GET / HTTP/1.1\r\nHost: h\xE9\r\n\r\n").unwrap();
        assert_eq!(req.host.as_deref(), Some(&b"h\xE9"[..]));
    }

    #[test]
    fn unterminated_header_line_is_400() {
        let err = parse_request(b"GET / HTTP/1.1\r\nHost: h").unwrap_err();
        assert_eq!(err, Status::BadRequest);
    }
}
