use crate::errors::DomainError;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

/// Local address every intercepted DNS packet is rewritten to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RedirectTarget {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl RedirectTarget {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl TryFrom<SocketAddr> for RedirectTarget {
    type Error = DomainError;

    fn try_from(addr: SocketAddr) -> Result<Self, Self::Error> {
        match addr {
            SocketAddr::V4(v4) => Ok(Self::new(*v4.ip(), v4.port())),
            SocketAddr::V6(v6) => Err(DomainError::InvalidRedirectTarget(format!(
                "only IPv4 targets can be redirected to, got {}",
                v6
            ))),
        }
    }
}

impl FromStr for RedirectTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: SocketAddr = s
            .parse()
            .map_err(|e| DomainError::InvalidRedirectTarget(format!("'{}': {}", s, e)))?;
        Self::try_from(addr)
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
