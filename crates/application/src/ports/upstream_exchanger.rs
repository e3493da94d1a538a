use async_trait::async_trait;
use dnsproxy_domain::DomainError;

/// One request, one response against the upstream resolver.
#[async_trait]
pub trait UpstreamExchanger: Send + Sync {
    /// Sends the query bytes as-is and returns the raw reply bytes.
    async fn exchange(&self, query: &[u8]) -> Result<Vec<u8>, DomainError>;

    /// Human readable upstream identity for logs.
    fn server(&self) -> String;
}
