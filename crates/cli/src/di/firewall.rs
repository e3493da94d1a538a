use anyhow::Context;
use dnsproxy_application::use_cases::Redirector;
use dnsproxy_domain::RedirectTarget;
use dnsproxy_infrastructure::firewall::NftablesFirewall;
use std::net::SocketAddr;
use std::sync::Arc;

pub fn build_redirector(bind_addr: SocketAddr) -> anyhow::Result<Redirector> {
    let target = RedirectTarget::try_from(bind_addr).context("cannot redirect to listener")?;
    Ok(Redirector::new(target, Arc::new(NftablesFirewall::new())))
}
