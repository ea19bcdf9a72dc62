//! HTTP status codes this proxy can emit, and the synthetic error page
//! writer for the ones the parser rejects requests with.

use std::io::{self, Write};

use chrono::Utc;

/// The closed set of status codes the proxy can log or write to the wire.
///
/// Mirrors `enum status` in the original source, minus the static-file-only
/// codes (`206`, `301`, `304`, `403`, `404`, `416`) that never occur on the
/// live `parse -> proxy` path this crate implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 200,
    BadRequest = 400,
    MethodNotAllowed = 405,
    RequestTimeout = 408,
    RequestTooLarge = 431,
    InternalServerError = 500,
    VersionNotSupported = 505,
}

impl Status {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::RequestTimeout => "Request Time-out",
            Status::RequestTooLarge => "Request Header Fields Too Large",
            Status::InternalServerError => "Internal Server Error",
            Status::VersionNotSupported => "HTTP Version not supported",
        }
    }
}

/// Writes a synthetic `HTTP/1.1` error response directly to `out`.
///
/// Returns the status that was actually logged: `status` on success, or
/// `Status::RequestTimeout` if writing the response itself failed (the
/// worker then has nothing more to say to a client it can't reach).
pub fn send_status<W: Write>(out: &mut W, status: Status) -> Status {
    let allow_header = if status == Status::MethodNotAllowed {
        "Allow: HEAD, GET\r\n"
    } else {
        ""
    };
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    let body = format!(
        "<!DOCTYPE html>\n<html>\n\t<head>\n\t\t<title>{code} {reason}</title>\n\t</head>\n\t<body>\n\t\t<h1>{code} {reason}</h1>\n\t</body>\n</html>\n",
        code = status.code(),
        reason = status.reason(),
    );
    let response = format!(
        "HTTP/1.1 {code} {reason}\r\nDate: {date}\r\nConnection: close\r\n{allow}Content-Type: text/html\r\nContent-Length: {len}\r\n\r\n{body}",
        code = status.code(),
        reason = status.reason(),
        date = date,
        allow = allow_header,
        len = body.len(),
        body = body,
    );

    match out.write_all(response.as_bytes()) {
        Ok(()) => status,
        Err(_) => Status::RequestTimeout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_allowed_carries_allow_header() {
        let mut buf = Vec::new();
        let ret = send_status(&mut buf, Status::MethodNotAllowed);
        assert_eq!(ret, Status::MethodNotAllowed);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        assert!(text.contains("Allow: HEAD, GET\r\n"));
        assert!(text.contains("405 Method Not Allowed"));
    }

    #[test]
    fn other_statuses_omit_allow_header() {
        let mut buf = Vec::new();
        send_status(&mut buf, Status::BadRequest);
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("Allow:"));
    }

    #[test]
    fn write_failure_is_logged_as_timeout() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let mut w = FailingWriter;
        let ret = send_status(&mut w, Status::BadRequest);
        assert_eq!(ret, Status::RequestTimeout);
    }
}
