use anyhow::Context;
use dnsproxy_domain::{CliOverrides, Config};
use std::net::{Ipv4Addr, TcpListener};

pub fn load_config(path: Option<&str>, cli_overrides: CliOverrides) -> anyhow::Result<Config> {
    Config::load(path, cli_overrides).context("invalid configuration")
}

/// Asks the kernel for an unused port and releases it right away.
pub fn pick_free_port(bind_address: Ipv4Addr) -> anyhow::Result<u16> {
    let listener = TcpListener::bind((bind_address, 0))
        .with_context(|| format!("no free port on {}", bind_address))?;
    let port = listener
        .local_addr()
        .context("failed to read ephemeral port")?
        .port();
    Ok(port)
}
