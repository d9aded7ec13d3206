//! Server configuration.
//!
//! Defaults suit a pod behind an ingress. Override them in code or through
//! the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `SIEVE_ADDR` | `0.0.0.0:3000` |
//! | `SIEVE_SHUTDOWN_GRACE_SECS` | `30` |

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Error;

pub const ADDR_VAR: &str = "SIEVE_ADDR";
pub const SHUTDOWN_GRACE_VAR: &str = "SIEVE_SHUTDOWN_GRACE_SECS";

/// Settings for [`Server`](crate::Server).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// How long in-flight connections may keep running after a shutdown
    /// signal. Keep it below the pod's `terminationGracePeriodSeconds`.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Reads the process environment, falling back to defaults for unset
    /// variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(addr) = lookup(ADDR_VAR) {
            config.addr = parse_addr(&addr)?;
        }

        if let Some(secs) = lookup(SHUTDOWN_GRACE_VAR) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{SHUTDOWN_GRACE_VAR} must be a whole number of seconds, got `{secs}`"))
            })?;
            config.shutdown_grace = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

pub(crate) fn parse_addr(addr: &str) -> Result<SocketAddr, Error> {
    addr.trim().parse().map_err(|source| Error::InvalidAddr { addr: addr.to_owned(), source })
}
