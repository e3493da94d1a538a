use anyhow::Context;
use dnsproxy_application::services::OverrideTable;
use dnsproxy_application::use_cases::HandleDnsQueryUseCase;
use dnsproxy_domain::Config;
use dnsproxy_infrastructure::dns::{DnsServerHandler, TlsTransport};
use std::sync::Arc;
use tracing::info;

pub struct DnsServices {
    pub overrides: Arc<OverrideTable>,
    pub handler: DnsServerHandler,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let entries = config.host_overrides()?;
        let overrides = Arc::new(
            OverrideTable::from_overrides(&entries).context("failed to build override table")?,
        );

        for entry in &entries {
            info!(
                hostname = %entry.hostname,
                record_type = entry.value.record_type(),
                value = %entry.value,
                "Override registered"
            );
        }

        let upstream = Arc::new(TlsTransport::new(
            config.upstream.address,
            config.upstream.tls_name.clone(),
            config.upstream.timeout(),
        ));
        info!(
            upstream = %config.upstream.address,
            tls_name = %config.upstream.tls_name,
            timeout_ms = config.upstream.timeout_ms,
            "Upstream resolver configured"
        );

        let use_case = Arc::new(HandleDnsQueryUseCase::new(overrides.clone(), upstream));

        Ok(Self {
            overrides,
            handler: DnsServerHandler::new(use_case),
        })
    }
}
