use async_trait::async_trait;
use dnsproxy_domain::{DomainError, RuleBatch, TableRef};

/// Transactional channel to the kernel packet filter.
#[async_trait]
pub trait FirewallPort: Send + Sync {
    /// Applies every change of the batch or none of them.
    ///
    /// Referencing a chain that does not exist fails with
    /// [`DomainError::ChainNotFound`]; any other rejection is
    /// [`DomainError::FirewallCommit`].
    async fn commit(&self, batch: &RuleBatch) -> Result<(), DomainError>;

    /// Names of the chains currently in `table`. An absent table has none.
    async fn list_chains(&self, table: &TableRef) -> Result<Vec<String>, DomainError>;
}
