use super::rule::{
    ChainHook, ChainRef, ChainSpec, ChainType, DestNat, FirewallChange, NatRule, PacketMatch,
    RuleBatch, TableFamily, TableRef, TransportProtocol,
};
use crate::redirect::RedirectTarget;

pub const DNS_PORT: u16 = 53;
pub const NAT_TABLE: &str = "nat";
pub const CHAIN_NAME: &str = "dnsproxy";

// Destination port sits at the same place in TCP and UDP headers.
const DST_PORT_OFFSET: u32 = 2;
const DST_PORT_LEN: u32 = 2;

pub fn redirect_chain() -> ChainRef {
    ChainRef {
        table: TableRef {
            family: TableFamily::Ip,
            name: NAT_TABLE.to_string(),
        },
        name: CHAIN_NAME.to_string(),
    }
}

/// `<proto> dport 53 dnat to <target>`
pub fn compile_rule(protocol: TransportProtocol, target: &RedirectTarget) -> NatRule {
    NatRule {
        chain: redirect_chain(),
        matches: vec![
            PacketMatch::L4Proto(protocol),
            PacketMatch::TransportHeaderField {
                offset: DST_PORT_OFFSET,
                len: DST_PORT_LEN,
                value: DNS_PORT,
            },
        ],
        dnat: DestNat {
            addr: target.host,
            port: target.port,
        },
    }
}

pub fn compile_rules(target: &RedirectTarget) -> Vec<NatRule> {
    TransportProtocol::ALL
        .iter()
        .map(|proto| compile_rule(*proto, target))
        .collect()
}

/// Creates the table and chain if absent, empties the chain, then adds both
/// rules. Flushing first keeps a leftover chain from yielding duplicates.
pub fn install_batch(target: &RedirectTarget) -> RuleBatch {
    let chain = redirect_chain();
    let mut batch = RuleBatch::new();

    batch
        .push(FirewallChange::AddTable(chain.table.clone()))
        .push(FirewallChange::AddChain(ChainSpec {
            chain: chain.clone(),
            chain_type: ChainType::Nat,
            hook: ChainHook::Output,
            priority: 0,
        }))
        .push(FirewallChange::FlushChain(chain));

    for rule in compile_rules(target) {
        batch.push(FirewallChange::AddRule(rule));
    }

    batch
}

/// Deletes the chain by reference, whatever it currently holds.
pub fn removal_batch() -> RuleBatch {
    let mut batch = RuleBatch::new();
    batch.push(FirewallChange::DeleteChain(redirect_chain()));
    batch
}
