//! Backend dialer: opens a fresh blocking TCP connection to a loopback
//! backend for every request. No pooling, no reuse — spec.md's Non-goals
//! explicitly exclude connection reuse/keep-alive to either side.

use std::io;
use std::mem;
use std::net::{Ipv4Addr, TcpStream};
use std::os::unix::io::FromRawFd;
use std::time::Duration;

/// Connects to `127.0.0.1:<port>` with `SO_REUSEADDR` set on the socket
/// before `connect`, matching `open_remote_host` in the original (the
/// original hardcodes `localhost`, which on any sane resolver configuration
/// resolves to the loopback address; dialing the literal loopback address
/// directly avoids a DNS round-trip for a destination that is always local).
///
/// `std::net::TcpStream::connect` gives no hook to set a socket option
/// before connecting, so the socket is built by hand through raw `libc` (the
/// same family of call `listener.rs` uses for its own listening socket) and
/// handed to `TcpStream` via `FromRawFd` once connected.
///
/// The returned stream carries the same `read_timeout`/`write_timeout`
/// discipline as the client socket (spec.md §4.4): the original switches
/// the backend socket non-blocking right after connect while the copy loop
/// below it is written blocking-style, which spec.md's design notes call
/// out as almost certainly a bug. This keeps the backend blocking with an
/// explicit timeout instead.
pub fn dial_backend(port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let stream = connect_with_reuseaddr(port)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

fn connect_with_reuseaddr(port: u16) -> io::Result<TcpStream> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let optval: libc::c_int = 1;
        let ret = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &optval as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if ret < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        let mut addr: libc::sockaddr_in = mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_port = port.to_be();
        addr.sin_addr.s_addr = u32::from(Ipv4Addr::LOCALHOST).to_be();

        let ret = libc::connect(
            fd,
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if ret < 0 {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        Ok(TcpStream::from_raw_fd(fd))
    }
}
