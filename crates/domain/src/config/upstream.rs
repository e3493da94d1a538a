use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// DNS-over-TLS resolver every non-overridden query is relayed to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_address")]
    pub address: SocketAddr,

    /// Name presented in SNI and checked against the server certificate.
    #[serde(default = "default_tls_name")]
    pub tls_name: String,

    /// Deadline for one complete exchange (connect, handshake, query, reply).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            tls_name: default_tls_name(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), 853)
}

fn default_tls_name() -> String {
    "cloudflare-dns.com".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}
