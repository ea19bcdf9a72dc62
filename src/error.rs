//! Error types for startup and routing-table parsing.
//!
//! Per-connection failures never produce a Rust error: they are mapped
//! straight to an HTTP status code and handled at the worker boundary (see
//! `status.rs` and `worker.rs`). These types cover only the two sentinel
//! categories that never reach a client: fatal startup errors (exit 1) and
//! malformed routing-table entries (also fatal at startup).

use std::path::PathBuf;

/// A malformed `<prefix>@<port>` positional argument.
#[derive(Debug, thiserror::Error)]
pub enum RouteParseError {
    #[error("'{0}' missing '@'")]
    MissingAt(String),

    #[error("'{0}': port must be 1..=65535")]
    PortOutOfRange(String),

    #[error("'{0}': port is not a number")]
    PortNotNumeric(String),
}

/// Fatal errors that abort the process with exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("UNIX-domain socket name truncated: {0}")]
    UdsNameTooLong(PathBuf),

    #[error("bind {path}: {source}")]
    BindUds {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chdir {path}: {source}")]
    Chdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Route(#[from] RouteParseError),

    #[error("at least one routing entry is required")]
    NoRoutes,
}
