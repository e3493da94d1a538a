use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("Invalid override record: {0}")]
    InvalidRecord(String),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirectTarget(String),

    #[error("Invalid DNS message: {0}")]
    InvalidDnsMessage(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Upstream timeout talking to {server}")]
    UpstreamTimeout { server: String },

    #[error("Upstream connection to {server} failed: {reason}")]
    UpstreamConnection { server: String, reason: String },

    #[error("Firewall commit rejected: {0}")]
    FirewallCommit(String),

    #[error("Chain {table}/{chain} not found")]
    ChainNotFound { table: String, chain: String },

    #[error("Failed to install redirect rules: {0}")]
    RuleInstall(String),

    #[error("Failed to remove redirect rules: {0}")]
    RuleRemoval(String),

    #[error("Listener failed: {0}")]
    Listener(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DomainError {
    /// True for the failures that end a single upstream exchange.
    pub fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout { .. }
                | Self::UpstreamConnection { .. }
                | Self::InvalidDnsResponse(_)
        )
    }
}
