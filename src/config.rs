//! Command-line surface and the `Config` it resolves to.
//!
//! The flags mirror spec.md §6 (and, beneath that, the original's
//! `ARGBEGIN`/`ARGEND` loop): `-v` prints a version and exits, `-h`/`-p`
//! pick the TCP listen address, `-U` switches to a UNIX-domain listener,
//! `-d` chdirs before serving, `-l`/`-L` are accepted-but-ignored
//! directory-listing flags kept only for invocation compatibility, and one
//! or more positional `<prefix>@<port>` routing entries are required.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{RouteParseError, StartupError};
use crate::matcher::{RouteEntry, RoutingTable};

/// Default concurrent-worker ceiling, the thread-per-connection analogue
/// of the original's `maxnprocs` `RLIMIT_NPROC` constant (see
/// SPEC_FULL.md §2).
pub const DEFAULT_WORKER_LIMIT: usize = 4096;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "8080";

#[derive(Parser, Debug)]
#[command(name = "frontproxy", version, about = "Host-routed HTTP reverse proxy", disable_version_flag = true)]
pub struct Cli {
    /// Print version and exit.
    #[arg(short = 'v', action = clap::ArgAction::Version)]
    pub version: (),

    /// Bind address for the TCP listener.
    #[arg(short = 'h', long = "host", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bind port for the TCP listener.
    #[arg(short = 'p', long = "port", default_value = DEFAULT_PORT)]
    pub port: String,

    /// Bind a UNIX-domain stream socket here instead of a TCP listener.
    #[arg(short = 'U', long = "unix-socket")]
    pub unix_socket: Option<PathBuf>,

    /// chdir into this directory before serving.
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<PathBuf>,

    /// Accepted for invocation compatibility; the proxy path never serves
    /// directory listings.
    #[arg(short = 'l')]
    pub list_dirs: bool,

    /// Accepted for invocation compatibility; the proxy path never serves
    /// directory listings.
    #[arg(short = 'L')]
    pub list_dirs_recursive: bool,

    /// Maximum number of concurrently live connection workers.
    #[arg(short = 'n', long = "max-connections", default_value_t = DEFAULT_WORKER_LIMIT)]
    pub worker_limit: usize,

    /// Routing entries of the form `<prefix>@<port>`; at least one is
    /// required.
    #[arg(required = true)]
    pub routes: Vec<String>,
}

/// Fully resolved startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: String,
    pub unix_socket: Option<PathBuf>,
    pub dir: Option<PathBuf>,
    pub worker_limit: usize,
    pub routes: RoutingTable,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, StartupError> {
        if cli.routes.is_empty() {
            return Err(StartupError::NoRoutes);
        }
        let entries = cli
            .routes
            .iter()
            .map(|s| parse_route_entry(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Config {
            host: cli.host,
            port: cli.port,
            unix_socket: cli.unix_socket,
            dir: cli.dir,
            worker_limit: cli.worker_limit,
            routes: RoutingTable::new(entries),
        })
    }
}

/// Parses one positional `<prefix>@<port>` argument.
///
/// Per spec.md §9's resolution of the original's `atoi` open question, the
/// port must be a plain decimal integer in `1..=65535`; anything else is a
/// fatal startup error rather than a silently-accepted negative or zero
/// port.
fn parse_route_entry(s: &str) -> Result<RouteEntry, RouteParseError> {
    let (prefix, port_str) = s
        .split_once('@')
        .ok_or_else(|| RouteParseError::MissingAt(s.to_string()))?;
    let port: u32 = port_str
        .parse()
        .map_err(|_| RouteParseError::PortNotNumeric(s.to_string()))?;
    if port == 0 || port > u16::MAX as u32 {
        return Err(RouteParseError::PortOutOfRange(s.to_string()));
    }
    Ok(RouteEntry {
        prefix: prefix.to_string(),
        port: port as u16,
    })
}
