use super::schema::{NftDocument, NftListing};
use async_trait::async_trait;
use dnsproxy_application::ports::FirewallPort;
use dnsproxy_domain::firewall::{CHAIN_NAME, NAT_TABLE};
use dnsproxy_domain::{DomainError, FirewallChange, RuleBatch, TableRef};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const NFT_BINARY: &str = "nft";
// errno text nft prints when a referenced object is absent
const ENOENT_MESSAGE: &str = "No such file or directory";

/// Applies rule batches through the `nft` command in JSON mode.
///
/// `nft -f` runs a whole file as one netlink transaction, so a batch either
/// lands completely or not at all.
pub struct NftablesFirewall {
    binary: PathBuf,
}

impl Default for NftablesFirewall {
    fn default() -> Self {
        Self::new()
    }
}

impl NftablesFirewall {
    pub fn new() -> Self {
        Self::with_binary(NFT_BINARY)
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<NftOutput, DomainError> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            DomainError::FirewallCommit(format!("failed to run {}: {}", self.binary.display(), e))
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)
                .await
                .map_err(|e| DomainError::FirewallCommit(format!("failed to write batch: {}", e)))?;
            // EOF ends the batch
            drop(pipe);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DomainError::FirewallCommit(format!("nft did not finish: {}", e)))?;

        Ok(NftOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

struct NftOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

#[async_trait]
impl FirewallPort for NftablesFirewall {
    async fn commit(&self, batch: &RuleBatch) -> Result<(), DomainError> {
        let document = serde_json::to_vec(&NftDocument::from(batch))
            .map_err(|e| DomainError::FirewallCommit(format!("failed to encode batch: {}", e)))?;

        debug!(changes = batch.len(), "Committing nftables batch");
        let output = self.run(&["-j", "-f", "-"], Some(document.as_slice())).await?;

        if output.success {
            Ok(())
        } else {
            Err(classify_failure(&output.stderr, batch))
        }
    }

    async fn list_chains(&self, table: &TableRef) -> Result<Vec<String>, DomainError> {
        let output = self
            .run(&["-j", "list", "table", table.family.as_str(), table.name.as_str()], None)
            .await?;

        if !output.success {
            if output.stderr.contains(ENOENT_MESSAGE) {
                return Ok(Vec::new());
            }
            return Err(DomainError::FirewallCommit(output.stderr));
        }

        let listing: NftListing = serde_json::from_str(&output.stdout).map_err(|e| {
            DomainError::FirewallCommit(format!("unreadable nft listing: {}", e))
        })?;

        Ok(listing
            .chains()
            .filter(|chain| chain.family == table.family.as_str() && chain.table == table.name)
            .map(|chain| chain.name)
            .collect())
    }
}

/// Maps nft's error text onto the port's error contract.
pub fn classify_failure(stderr: &str, batch: &RuleBatch) -> DomainError {
    if stderr.contains(ENOENT_MESSAGE) {
        let (table, chain) = batch
            .changes()
            .iter()
            .find_map(|change| match change {
                FirewallChange::FlushChain(chain) | FirewallChange::DeleteChain(chain) => {
                    Some((chain.table.name.clone(), chain.name.clone()))
                }
                FirewallChange::AddRule(rule) => {
                    Some((rule.chain.table.name.clone(), rule.chain.name.clone()))
                }
                _ => None,
            })
            .unwrap_or_else(|| (NAT_TABLE.to_string(), CHAIN_NAME.to_string()));
        return DomainError::ChainNotFound { table, chain };
    }

    if stderr.is_empty() {
        DomainError::FirewallCommit("nft exited with an error".to_string())
    } else {
        DomainError::FirewallCommit(stderr.to_string())
    }
}
