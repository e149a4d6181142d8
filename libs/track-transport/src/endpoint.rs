use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use track_api::TrackError;

/// Transport address in `scheme://host:port` form.
///
/// - `tcp://` binds a ZeroMQ PUB socket that SUB sockets connect to;
/// - `tcp+raw://` binds a plain listener and streams framed records;
/// - `udp://` sends datagrams to the given (possibly multicast) address.
///
/// A `*` host means all interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Zmq(SocketAddr),
    RawTcp(SocketAddr),
    Udp(SocketAddr),
}

impl Endpoint {
    pub fn addr(&self) -> SocketAddr {
        match self {
            Endpoint::Zmq(a) | Endpoint::RawTcp(a) | Endpoint::Udp(a) => *a,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Zmq(_) => "tcp",
            Endpoint::RawTcp(_) => "tcp+raw",
            Endpoint::Udp(_) => "udp",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| TrackError::config(format!("endpoint {s:?}: expected scheme://host:port")))?;
        let addr = resolve(s, rest)?;
        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Endpoint::Zmq(addr)),
            "tcp+raw" => Ok(Endpoint::RawTcp(addr)),
            "udp" => Ok(Endpoint::Udp(addr)),
            other => Err(TrackError::config(format!(
                "endpoint {s:?}: unsupported scheme {other:?} (tcp, tcp+raw, udp)"
            ))),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.addr())
    }
}

fn resolve(full: &str, host_port: &str) -> Result<SocketAddr, TrackError> {
    let (host, port) = host_port
        .rsplit_once(':')
        .ok_or_else(|| TrackError::config(format!("endpoint {full:?}: missing port")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| TrackError::config(format!("endpoint {full:?}: bad port {port:?}")))?;
    let host = match host {
        "*" => "0.0.0.0",
        h => h.trim_start_matches('[').trim_end_matches(']'),
    };
    if host.is_empty() {
        return Err(TrackError::config(format!("endpoint {full:?}: missing host")));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| TrackError::config(format!("endpoint {full:?}: {e}")))?
        .next()
        .ok_or_else(|| TrackError::config(format!("endpoint {full:?}: host did not resolve")))
}
