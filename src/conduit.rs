//! The proxy conduit: header replay followed by a one-directional copy of
//! the backend's reply back to the client. No concurrency within a single
//! conduit run — it is three sequential stages, as spec.md §4.5 describes.

use std::io::{Read, Write};
use std::time::Duration;

use crate::backend::dial_backend;
use crate::status::Status;

/// Scratch buffer size for the backend-to-client copy loop, matching the
/// original's `BUFSIZ`.
const COPY_BUF: usize = 8192;

/// Runs the full conduit for one request: dial, header replay, response
/// stream, implicit teardown (both sockets are dropped — and therefore
/// closed — when this returns).
///
/// Returns the status to log: `Status::Ok` only once the backend has been
/// fully drained, `Status::InternalServerError` for dial failure, a
/// header-replay write failure, or a backend read failure, and
/// `Status::RequestTimeout` for a client-write failure partway through
/// streaming the reply (spec.md §4.5 conflates this with the socket's
/// 30-second timeout).
pub fn run<W: Write>(client: &mut W, backend_port: u16, header: &[u8], timeout: Duration) -> Status {
    let mut backend = match dial_backend(backend_port, timeout) {
        Ok(b) => b,
        Err(_) => return Status::InternalServerError,
    };

    if backend.write_all(header).is_err() {
        return Status::InternalServerError;
    }

    let mut buf = [0u8; COPY_BUF];
    loop {
        let n = match backend.read(&mut buf) {
            Ok(0) => return Status::Ok,
            Ok(n) => n,
            Err(_) => return Status::InternalServerError,
        };
        if client.write_all(&buf[..n]).is_err() {
            return Status::RequestTimeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn spawn_echo_backend() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut req = [0u8; 1024];
                let _ = stream.read(&mut req);
                let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
            }
        });
        port
    }

    #[test]
    fn streams_backend_reply_to_client_and_logs_200() {
        let backend_port = spawn_echo_backend();
        let client_listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client_addr = client_listener.local_addr().unwrap();

        let client_thread = thread::spawn(move || {
            let mut client = TcpStream::connect(client_addr).unwrap();
            let header = b"GET / HTTP/1.1\r\nHost: www.example.com\r\n\r\n";
            run(&mut client, backend_port, header, Duration::from_secs(5))
        });

        let (mut srv_side, _) = client_listener.accept().unwrap();
        let mut received = Vec::new();
        srv_side.read_to_end(&mut received).unwrap();

        let status = client_thread.join().unwrap();
        assert_eq!(status, Status::Ok);
        assert_eq!(received, b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
    }

    #[test]
    fn dial_failure_is_500() {
        // Port 1 is a privileged port almost certainly not listening in a
        // test sandbox; connecting to loopback on it should fail fast.
        let client_listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = client_listener.local_addr().unwrap();
        let t = thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            run(&mut client, 1, b"GET / HTTP/1.0\r\n\r\n", Duration::from_millis(200))
        });
        let _ = client_listener.accept().unwrap();
        let status = t.join().unwrap();
        assert_eq!(status, Status::InternalServerError);
    }
}
