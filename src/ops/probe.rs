//! TCP reachability probe
//!
//! Checks whether a host accepts connections on a port, the way builders and
//! cloud instances are screened before anything heavier is run against them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::executor::Args;

/// Default port when a target names only a host
pub const DEFAULT_PORT: u16 = 22;

/// Probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Timeout after {1}ms connecting to {0}")]
    Timeout(ProbeTarget, u128),

    #[error("Connection to {target} failed: {source}")]
    Connect {
        target: ProbeTarget,
        #[source]
        source: std::io::Error,
    },
}

/// Host and port to probe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or `[v6addr]:port`
    pub fn parse(s: &str, default_port: u16) -> Result<Self, ProbeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ProbeError::InvalidTarget("empty host".to_string()));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| ProbeError::InvalidTarget(s.to_string()))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, s)?,
                None if tail.is_empty() => default_port,
                None => return Err(ProbeError::InvalidTarget(s.to_string())),
            };
            return Ok(Self::new(host, port));
        }

        // Bare IPv6 addresses carry more than one colon
        match s.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => Ok(Self::new(host, parse_port(port, s)?)),
            _ => Ok(Self::new(s, default_port)),
        }
    }

    /// Build a target from task arguments
    ///
    /// Accepts a `"host[:port]"` string, a `{"host", "port"}` object (whole or
    /// spread as keywords) or a `[host, port]` pair spread positionally.
    pub fn from_args(args: &Args, default_port: u16) -> Result<Self, ProbeError> {
        match args {
            Args::Single(Value::String(s)) => Self::parse(s, default_port),
            Args::Single(Value::Object(map)) => {
                Self::from_args(&Args::Keyword(map.clone()), default_port)
            }
            Args::Keyword(_) => {
                let host: String = args
                    .named("host")
                    .map_err(|e| ProbeError::InvalidTarget(e.to_string()))?;
                let port: Option<u16> = args
                    .named_opt("port")
                    .map_err(|e| ProbeError::InvalidTarget(e.to_string()))?;
                Ok(Self::new(host, port.unwrap_or(default_port)))
            }
            Args::Positional(items) => match items.as_slice() {
                [Value::String(host)] => Self::parse(host, default_port),
                [Value::String(host), port] => {
                    let port = port
                        .as_u64()
                        .and_then(|p| u16::try_from(p).ok())
                        .ok_or_else(|| ProbeError::InvalidTarget(port.to_string()))?;
                    Ok(Self::new(host.clone(), port))
                }
                _ => Err(ProbeError::InvalidTarget(args.to_string())),
            },
            Args::Single(other) => Err(ProbeError::InvalidTarget(other.to_string())),
        }
    }
}

fn parse_port(port: &str, target: &str) -> Result<u16, ProbeError> {
    port.parse()
        .map_err(|_| ProbeError::InvalidTarget(target.to_string()))
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Result of a successful probe
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeReport {
    pub target: String,
    pub address: String,
    pub latency_ms: u64,
}

/// Connect to the target described by `args` within `connect_timeout`
pub async fn probe(
    args: Args,
    default_port: u16,
    connect_timeout: Duration,
) -> Result<ProbeReport, ProbeError> {
    let target = ProbeTarget::from_args(&args, default_port)?;
    debug!("Probing {}", target);

    let start = Instant::now();
    let stream = timeout(
        connect_timeout,
        TcpStream::connect((target.host.as_str(), target.port)),
    )
    .await
    .map_err(|_| ProbeError::Timeout(target.clone(), connect_timeout.as_millis()))?
    .map_err(|source| ProbeError::Connect {
        target: target.clone(),
        source,
    })?;

    let address = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| target.to_string());

    Ok(ProbeReport {
        target: target.to_string(),
        address,
        latency_ms: start.elapsed().as_millis() as u64,
    })
}
