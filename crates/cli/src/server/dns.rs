use anyhow::Context;
use dnsproxy_domain::Config;
use dnsproxy_infrastructure::dns::{DnsListenerSet, DnsServerHandler};
use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn bind_dns_listeners(
    bind_addr: SocketAddr,
    config: &Config,
    handler: DnsServerHandler,
) -> anyhow::Result<DnsListenerSet> {
    let idle_timeout = Duration::from_secs(config.server.tcp_idle_timeout_secs);
    let listeners = DnsListenerSet::bind(bind_addr, handler, idle_timeout)
        .with_context(|| format!("failed to bind DNS listeners on {}", bind_addr))?;

    info!(bind_address = %bind_addr, "DNS listeners bound");
    Ok(listeners)
}

pub async fn start_dns_server(
    listeners: DnsListenerSet,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    listeners
        .serve(shutdown)
        .await
        .context("DNS server stopped with an error")
}
