//! The per-connection worker: owns one accepted client socket end to end
//! (timeouts, parse, route, proxy, log, teardown), matching spec.md §4.6.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use tracing::error;

use crate::client_stream::ClientStream;
use crate::header::{read_header, HeaderBuffer, ReadHeaderError};
use crate::matcher::RoutingTable;
use crate::request::parse_request;
use crate::status::{send_status, Status};

/// Socket send/receive timeout applied to every blocking I/O call a worker
/// makes, on both the client and backend sockets, matching the original's
/// hardcoded 30 seconds.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one connection to completion. Never panics on a malformed request
/// or a dead backend — those are ordinary, logged outcomes — but does not
/// catch panics from lower layers; the supervisor's thread boundary is
/// expected to isolate those (a panicking worker thread takes down only
/// itself under the default panic runtime).
pub fn handle_connection(mut stream: ClientStream, routes: &RoutingTable) {
    if stream.set_read_timeout(Some(IO_TIMEOUT)).is_err()
        || stream.set_write_timeout(Some(IO_TIMEOUT)).is_err()
    {
        error!("failed to set socket timeouts; abandoning connection");
        return;
    }

    let peer = stream.peer_label();
    let mut header = HeaderBuffer::new();

    let (status, target) = match read_header(&mut stream, &mut header) {
        Err(ReadHeaderError::TooLarge) => (send_status(&mut stream, Status::RequestTooLarge), Vec::new()),
        Err(ReadHeaderError::BadRequest) => (send_status(&mut stream, Status::BadRequest), Vec::new()),
        Err(ReadHeaderError::Timeout) => (send_status(&mut stream, Status::RequestTimeout), Vec::new()),
        Ok(()) => match parse_request(header.as_bytes()) {
            Err(status) => (send_status(&mut stream, status), Vec::new()),
            Ok(req) => {
                let target = req.target.clone();
                let status = proxy_request(&mut stream, &req, header.as_bytes(), routes);
                (status, target)
            }
        },
    };

    log_line(&peer, status, &target);

    stream.shutdown_both();
}

fn proxy_request(
    stream: &mut ClientStream,
    req: &crate::request::Request,
    header_bytes: &[u8],
    routes: &RoutingTable,
) -> Status {
    let Some(host) = req.host.as_deref() else {
        return send_status(stream, Status::BadRequest);
    };
    if host.is_empty() {
        return send_status(stream, Status::BadRequest);
    }
    let Some(port) = routes.match_host(host) else {
        return send_status(stream, Status::BadRequest);
    };
    crate::conduit::run(stream, port, header_bytes, IO_TIMEOUT)
}

/// Writes the single tab-separated access-log record for this connection
/// as one buffered `write_all` call, so concurrent workers' records are
/// never interleaved (spec.md §5, §6). `target` is the raw, possibly
/// non-UTF-8 percent-decoded request target; it is appended as bytes rather
/// than through a `String`-interpolated `format!`, so a decoded byte ≥ 0x80
/// reaches the log untouched instead of being replaced by `from_utf8_lossy`.
fn log_line(peer: &str, status: Status, target: &[u8]) {
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S");
    let mut line = format!("{timestamp}\t{peer}\t{code}\t", code = status.code()).into_bytes();
    line.extend_from_slice(target);
    line.push(b'\n');
    let _ = std::io::stdout().lock().write_all(&line);
}
