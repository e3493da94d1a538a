use crate::ports::FirewallPort;
use dnsproxy_domain::firewall::{install_batch, redirect_chain, removal_batch};
use dnsproxy_domain::{DomainError, RedirectTarget};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectorState {
    Inactive,
    Active,
}

/// Owns the lifecycle of the `ip nat dnsproxy` chain.
///
/// `start` and `close` are serialized; the chain is only touched through
/// whole batches so the kernel never sees half of it.
pub struct Redirector {
    target: RedirectTarget,
    firewall: Arc<dyn FirewallPort>,
    state: Mutex<RedirectorState>,
}

impl Redirector {
    pub fn new(target: RedirectTarget, firewall: Arc<dyn FirewallPort>) -> Self {
        Self {
            target,
            firewall,
            state: Mutex::new(RedirectorState::Inactive),
        }
    }

    pub fn target(&self) -> RedirectTarget {
        self.target
    }

    pub async fn state(&self) -> RedirectorState {
        *self.state.lock().await
    }

    pub async fn start(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if *state == RedirectorState::Active {
            debug!(target = %self.target, "Redirect rules already installed");
            return Ok(());
        }

        let batch = install_batch(&self.target);
        self.firewall
            .commit(&batch)
            .await
            .map_err(|e| DomainError::RuleInstall(e.to_string()))?;

        *state = RedirectorState::Active;
        info!(
            chain = %redirect_chain(),
            target = %self.target,
            rules = batch.rules().count(),
            "Redirect rules installed"
        );
        Ok(())
    }

    /// Deletes the chain whether or not this instance created it. A missing
    /// chain counts as already removed.
    pub async fn close(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;

        match self.firewall.commit(&removal_batch()).await {
            Ok(()) => {
                info!(chain = %redirect_chain(), "Redirect rules removed");
            }
            Err(DomainError::ChainNotFound { table, chain }) => {
                debug!(%table, %chain, "No redirect chain to remove");
            }
            Err(e) => return Err(DomainError::RuleRemoval(e.to_string())),
        }

        *state = RedirectorState::Inactive;
        Ok(())
    }

    /// Whether the kernel currently holds the redirect chain.
    pub async fn is_installed(&self) -> Result<bool, DomainError> {
        let chain = redirect_chain();
        let chains = self.firewall.list_chains(&chain.table).await?;
        Ok(chains.iter().any(|name| *name == chain.name))
    }
}
