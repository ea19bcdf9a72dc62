//! Listener supervisor: binds, listens, and accepts in a single loop,
//! handing each connection to a freshly spawned worker thread (spec.md
//! §4.8). Exactly one of the TCP or UNIX-domain listener families is bound
//! per process, chosen by `-U`.

use std::io;
use std::mem;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::unix::io::FromRawFd;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use crate::client_stream::ClientStream;
use crate::error::StartupError;
use crate::matcher::RoutingTable;
use crate::semaphore::Semaphore;
use crate::worker::handle_connection;

pub enum Listener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl Listener {
    /// The bound TCP port, if this is a TCP listener. Used by callers
    /// (tests, primarily) that bind to port 0 and need the ephemeral port
    /// the OS actually assigned.
    pub fn local_port(&self) -> Option<u16> {
        match self {
            Listener::Tcp(l) => l.local_addr().ok().map(|a| a.port()),
            Listener::Unix(_) => None,
        }
    }

    /// Binds a TCP listener on `host:port` with `SO_REUSEADDR` set,
    /// matching the original's `getipsock`. `SO_REUSEADDR` only affects
    /// whether `bind()` itself is allowed to succeed against an address
    /// still in `TIME_WAIT`; setting it on a socket that already bound
    /// successfully is a no-op. `std::net::TcpListener::bind` performs
    /// `socket()` and `bind()` together with no hook in between, so the
    /// listener here is instead built by hand through raw `libc` —
    /// `socket()`, `setsockopt(SO_REUSEADDR)`, then `bind()` and `listen()`
    /// in that order, mirroring `getipsock`'s own ordering — and handed to
    /// `TcpListener` via `FromRawFd` once listening.
    pub fn bind_tcp(host: &str, port: &str) -> Result<Self, StartupError> {
        let addr_str = format!("{host}:{port}");
        let addr = resolve_addr(&addr_str).map_err(|source| StartupError::Bind {
            addr: addr_str.clone(),
            source,
        })?;
        let listener = bind_with_reuseaddr(addr).map_err(|source| StartupError::Bind {
            addr: addr_str.clone(),
            source,
        })?;
        Ok(Listener::Tcp(listener))
    }

    /// Binds a UNIX-domain stream socket at `path`, unlinking any stale
    /// file first, matching the original's `getusock`.
    pub fn bind_unix(path: &Path) -> Result<Self, StartupError> {
        const MAX_SUN_PATH: usize = 108;
        if path.as_os_str().len() >= MAX_SUN_PATH {
            return Err(StartupError::UdsNameTooLong(path.to_path_buf()));
        }
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path).map_err(|source| StartupError::BindUds {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Listener::Unix(listener))
    }

    /// Runs the accept loop forever. Each accepted connection is handed to
    /// a new OS thread running `worker::handle_connection`; `accept`
    /// failures are logged and do not terminate the supervisor (spec.md
    /// §4.8, §7).
    pub fn serve(self, routes: Arc<RoutingTable>, worker_limit: usize) -> ! {
        let sem = Semaphore::new(worker_limit);
        info!("listening, worker_limit={worker_limit}");
        loop {
            let accepted = match &self {
                Listener::Tcp(l) => l.accept().map(|(s, _)| ClientStream::Tcp(s)),
                Listener::Unix(l) => l.accept().map(|(s, _)| ClientStream::Unix(s)),
            };
            let stream = match accepted {
                Ok(s) => s,
                Err(e) => {
                    error!("accept: {e}");
                    continue;
                }
            };
            let permit = sem.acquire();
            let routes = Arc::clone(&routes);
            thread::spawn(move || {
                let _permit = permit;
                handle_connection(stream, &routes);
            });
        }
    }
}

fn resolve_addr(addr_str: &str) -> io::Result<SocketAddr> {
    addr_str
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no addresses resolved"))
}

/// Accept backlog for a freshly bound listening socket, matching the
/// original's `listen(s, SOMAXCONN)`-equivalent call in `getipsock`.
const LISTEN_BACKLOG: libc::c_int = 128;

fn set_reuseaddr(fd: libc::c_int) -> io::Result<()> {
    let optval: libc::c_int = 1;
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &optval as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn bind_with_reuseaddr(addr: SocketAddr) -> io::Result<TcpListener> {
    match addr {
        SocketAddr::V4(v4) => unsafe {
            let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            if let Err(e) = set_reuseaddr(fd) {
                libc::close(fd);
                return Err(e);
            }

            let mut sa: libc::sockaddr_in = mem::zeroed();
            sa.sin_family = libc::AF_INET as libc::sa_family_t;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();

            let ret = libc::bind(
                fd,
                &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            );
            if ret < 0 {
                let e = io::Error::last_os_error();
                libc::close(fd);
                return Err(e);
            }
            if libc::listen(fd, LISTEN_BACKLOG) < 0 {
                let e = io::Error::last_os_error();
                libc::close(fd);
                return Err(e);
            }
            Ok(TcpListener::from_raw_fd(fd))
        },
        SocketAddr::V6(v6) => unsafe {
            let fd = libc::socket(libc::AF_INET6, libc::SOCK_STREAM, 0);
            if fd < 0 {
                return Err(io::Error::last_os_error());
            }
            if let Err(e) = set_reuseaddr(fd) {
                libc::close(fd);
                return Err(e);
            }

            let mut sa: libc::sockaddr_in6 = mem::zeroed();
            sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            sa.sin6_flowinfo = v6.flowinfo();
            sa.sin6_scope_id = v6.scope_id();

            let ret = libc::bind(
                fd,
                &sa as *const libc::sockaddr_in6 as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
            );
            if ret < 0 {
                let e = io::Error::last_os_error();
                libc::close(fd);
                return Err(e);
            }
            if libc::listen(fd, LISTEN_BACKLOG) < 0 {
                let e = io::Error::last_os_error();
                libc::close(fd);
                return Err(e);
            }
            Ok(TcpListener::from_raw_fd(fd))
        },
    }
}

/// `chdir`s into `dir` before serving, matching the original's `-d`
/// handling. Vestigial for the live proxy path (nothing under this crate
/// reads the filesystem per-request) but preserved for invocation
/// compatibility, per spec.md §1/§6.
pub fn chdir_if_requested(dir: Option<&PathBuf>) -> Result<(), StartupError> {
    if let Some(dir) = dir {
        std::env::set_current_dir(dir).map_err(|source| StartupError::Chdir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}
