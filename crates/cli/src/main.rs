use anyhow::Context;
use clap::Parser;
use dnsproxy_domain::{CliOverrides, HostnameOverride};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "dnsproxy")]
#[command(version)]
#[command(about = "Local DNS proxy answering configured hostnames and forwarding the rest over DNS-over-TLS")]
struct Cli {
    /// Listening port (a free port is picked when omitted)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Upstream DNS-over-TLS resolver address
    #[arg(long, value_name = "ADDR")]
    upstream: Option<SocketAddr>,

    /// Name expected in the upstream certificate
    #[arg(long, value_name = "NAME")]
    upstream_tls_name: Option<String>,

    /// Deadline for one upstream exchange, in milliseconds
    #[arg(long, value_name = "MS")]
    upstream_timeout_ms: Option<u64>,

    /// Serve without installing the nftables redirect
    #[arg(long)]
    no_redirect: bool,

    /// Overrides: an IPv4 value gives an A record, anything else a CNAME
    #[arg(value_name = "HOSTNAME=VALUE")]
    overrides: Vec<HostnameOverride>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        port: cli.port,
        log_level: cli.log_level,
        upstream_address: cli.upstream,
        upstream_tls_name: cli.upstream_tls_name,
        upstream_timeout_ms: cli.upstream_timeout_ms,
        no_redirect: cli.no_redirect,
        overrides: cli.overrides,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config.logging)?;

    info!("Starting dnsproxy v{}", env!("CARGO_PKG_VERSION"));

    // Before anything touches the firewall, so an early interrupt still
    // reaches the teardown path.
    let signals =
        server::ShutdownSignals::install().context("failed to install signal handlers")?;
    let shutdown = CancellationToken::new();
    tokio::spawn(signals.cancel_on_signal(shutdown.clone()));

    let port = match config.server.port {
        Some(port) => port,
        None => bootstrap::pick_free_port(config.server.bind_address)?,
    };
    let bind_addr = SocketAddr::from((config.server.bind_address, port));

    let dns_services = di::DnsServices::new(&config)?;
    info!(
        overrides = dns_services.overrides.len(),
        "Override table ready (built-in 'local' included)"
    );
    let listeners = server::bind_dns_listeners(bind_addr, &config, dns_services.handler)?;

    let redirector = if config.server.redirect {
        Some(di::build_redirector(bind_addr)?)
    } else {
        warn!("Redirect disabled, only direct queries to {} are served", bind_addr);
        None
    };

    server::run_with_redirect(
        redirector.as_ref(),
        &shutdown,
        server::start_dns_server(listeners, shutdown.clone()),
    )
    .await?;

    info!("Shutdown complete");
    Ok(())
}
