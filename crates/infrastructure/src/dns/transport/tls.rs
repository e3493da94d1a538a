//! DNS-over-TLS upstream (RFC 7858).
//!
//! Every exchange opens its own TCP connection, performs the TLS handshake,
//! sends one framed query and reads one framed reply. The whole exchange runs
//! under a single deadline.

use super::tcp::{read_with_length_prefix, send_with_length_prefix};
use async_trait::async_trait;
use dnsproxy_application::ports::UpstreamExchanger;
use dnsproxy_domain::DomainError;
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Shared TLS config, built once with the webpki root store.
static SHARED_TLS_CONFIG: LazyLock<Arc<rustls::ClientConfig>> = LazyLock::new(|| {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
});

pub struct TlsTransport {
    server_addr: SocketAddr,
    hostname: String,
    timeout: Duration,
    connector: TlsConnector,
}

impl TlsTransport {
    pub fn new(server_addr: SocketAddr, hostname: String, timeout: Duration) -> Self {
        Self::with_tls_config(server_addr, hostname, timeout, SHARED_TLS_CONFIG.clone())
    }

    /// Same transport with a caller-provided trust configuration.
    pub fn with_tls_config(
        server_addr: SocketAddr,
        hostname: String,
        timeout: Duration,
        config: Arc<rustls::ClientConfig>,
    ) -> Self {
        Self {
            server_addr,
            hostname,
            timeout,
            connector: TlsConnector::from(config),
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn connection_error(&self, reason: impl std::fmt::Display) -> DomainError {
        DomainError::UpstreamConnection {
            server: self.server_addr.to_string(),
            reason: reason.to_string(),
        }
    }

    async fn connect(&self) -> Result<TlsStream<TcpStream>, DomainError> {
        let server_name = ServerName::try_from(self.hostname.clone()).map_err(|e| {
            self.connection_error(format!("invalid TLS name '{}': {}", self.hostname, e))
        })?;

        let tcp_stream = TcpStream::connect(self.server_addr)
            .await
            .map_err(|e| self.connection_error(format!("connect failed: {}", e)))?;
        tcp_stream
            .set_nodelay(true)
            .map_err(|e| self.connection_error(format!("failed to set TCP_NODELAY: {}", e)))?;

        let tls_stream = self
            .connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| self.connection_error(format!("TLS handshake failed: {}", e)))?;

        debug!(server = %self.server_addr, hostname = %self.hostname, "TLS connection established");
        Ok(tls_stream)
    }

    async fn round_trip(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        let mut stream = self.connect().await?;

        send_with_length_prefix(&mut stream, query)
            .await
            .map_err(|e| self.connection_error(format!("failed to send query: {}", e)))?;

        let reply = read_with_length_prefix(&mut stream)
            .await
            .map_err(|e| self.connection_error(format!("failed to read reply: {}", e)))?
            .ok_or_else(|| self.connection_error("connection closed before reply"))?;

        // close_notify; the reply is already in hand
        let _ = stream.shutdown().await;

        debug!(
            server = %self.server_addr,
            query_len = query.len(),
            reply_len = reply.len(),
            "TLS response received"
        );
        Ok(reply)
    }
}

#[async_trait]
impl UpstreamExchanger for TlsTransport {
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        tokio::time::timeout(self.timeout, self.round_trip(query))
            .await
            .map_err(|_| DomainError::UpstreamTimeout {
                server: self.server_addr.to_string(),
            })?
    }

    fn server(&self) -> String {
        format!("{}#{}", self.server_addr, self.hostname)
    }
}
