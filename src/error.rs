//! Unified error type.

use thiserror::Error;

/// The error type returned by sieve's fallible operations.
///
/// Application-level failures (a rejected token, a malformed body) are
/// expressed as [`Response`](crate::Response) values produced by middlewares,
/// not as `Error`s. This type surfaces infrastructure failures: reading
/// configuration, binding to a port or accepting a connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("config: {0}")]
    Config(String),
}
