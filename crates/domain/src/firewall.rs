//! Declarative model of the nftables objects the redirector manages.
//!
//! Nothing here talks to the kernel. A [`RuleBatch`] is handed to a firewall
//! adapter which applies it as one transaction.

pub mod compiler;
pub mod rule;

pub use compiler::{
    compile_rule, compile_rules, install_batch, redirect_chain, removal_batch, CHAIN_NAME,
    DNS_PORT, NAT_TABLE,
};
pub use rule::{
    ChainHook, ChainRef, ChainSpec, ChainType, DestNat, FirewallChange, NatRule, PacketMatch,
    RuleBatch, TableFamily, TableRef, TransportProtocol,
};
