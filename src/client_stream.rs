//! A small abstraction over the two listener families (`spec.md` §4.8's
//! TCP listener and its UNIX-domain variant) so the connection worker can
//! be written once against a single type.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;
use std::time::Duration;

pub enum ClientStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl ClientStream {
    pub fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        match self {
            ClientStream::Tcp(s) => s.set_read_timeout(dur),
            ClientStream::Unix(s) => s.set_read_timeout(dur),
        }
    }

    pub fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
        match self {
            ClientStream::Tcp(s) => s.set_write_timeout(dur),
            ClientStream::Unix(s) => s.set_write_timeout(dur),
        }
    }

    /// Textual form of the peer address for the access log: dotted IPv4,
    /// bracket-less textual IPv6, or `"unix"` for a UNIX-domain peer (which
    /// has no IP to report).
    pub fn peer_label(&self) -> String {
        match self {
            ClientStream::Tcp(s) => s
                .peer_addr()
                .map(|a| a.ip().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            ClientStream::Unix(_) => "unix".to_string(),
        }
    }

    /// Half-closes both directions, matching the original's
    /// `shutdown(SHUT_RD)` + `shutdown(SHUT_WR)` before the final close.
    pub fn shutdown_both(&self) {
        let which = match self {
            ClientStream::Tcp(s) => s.shutdown(Shutdown::Both),
            ClientStream::Unix(s) => s.shutdown(Shutdown::Both),
        };
        let _ = which;
    }
}

impl Read for ClientStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ClientStream::Tcp(s) => s.read(buf),
            ClientStream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for ClientStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ClientStream::Tcp(s) => s.write(buf),
            ClientStream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ClientStream::Tcp(s) => s.flush(),
            ClientStream::Unix(s) => s.flush(),
        }
    }
}
