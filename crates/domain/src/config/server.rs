use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: Ipv4Addr,

    /// Listening port. An ephemeral port is picked when unset.
    #[serde(default)]
    pub port: Option<u16>,

    /// Install the nftables redirect chain on startup.
    #[serde(default = "default_true")]
    pub redirect: bool,

    /// Idle TCP connections are closed after this many seconds.
    #[serde(default = "default_tcp_idle_timeout")]
    pub tcp_idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: None,
            redirect: true,
            tcp_idle_timeout_secs: default_tcp_idle_timeout(),
        }
    }
}

fn default_bind_address() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

fn default_true() -> bool {
    true
}

fn default_tcp_idle_timeout() -> u64 {
    10
}
