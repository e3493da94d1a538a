//! Kernel packet filter access through nftables.

mod nftables;
pub mod schema;

pub use nftables::{classify_failure, NftablesFirewall};
