//! libnftables JSON documents (`nft -j`), see libnftables-json(5).

use dnsproxy_domain::{
    ChainHook, ChainRef, ChainSpec, ChainType, FirewallChange, NatRule, PacketMatch, RuleBatch,
    TableRef,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftDocument {
    pub nftables: Vec<NftCommand>,
}

impl From<&RuleBatch> for NftDocument {
    fn from(batch: &RuleBatch) -> Self {
        Self {
            nftables: batch.changes().iter().map(NftCommand::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NftCommand {
    Add(NftObject),
    Flush(NftObject),
    Delete(NftObject),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NftObject {
    Table(NftTable),
    Chain(NftChain),
    Rule(NftRule),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftTable {
    pub family: &'static str,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftChain {
    pub family: &'static str,
    pub table: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub chain_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prio: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<&'static str>,
}

impl NftChain {
    fn reference(chain: &ChainRef) -> Self {
        Self {
            family: chain.table.family.as_str(),
            table: chain.table.name.clone(),
            name: chain.name.clone(),
            chain_type: None,
            hook: None,
            prio: None,
            policy: None,
        }
    }

    fn base(spec: &ChainSpec) -> Self {
        Self {
            chain_type: Some(match spec.chain_type {
                ChainType::Nat => "nat",
            }),
            hook: Some(match spec.hook {
                ChainHook::Output => "output",
            }),
            prio: Some(spec.priority),
            policy: Some("accept"),
            ..Self::reference(&spec.chain)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftRule {
    pub family: &'static str,
    pub table: String,
    pub chain: String,
    pub expr: Vec<NftStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NftStatement {
    Match(NftMatch),
    Dnat(NftDnat),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftMatch {
    pub op: &'static str,
    pub left: NftExpression,
    pub right: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NftExpression {
    Meta {
        key: &'static str,
    },
    /// Raw payload; offset and length are in bits.
    Payload {
        base: &'static str,
        offset: u32,
        len: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftDnat {
    pub family: &'static str,
    pub addr: String,
    pub port: u16,
}

impl From<&PacketMatch> for NftStatement {
    fn from(packet_match: &PacketMatch) -> Self {
        match packet_match {
            PacketMatch::L4Proto(protocol) => NftStatement::Match(NftMatch {
                op: "==",
                left: NftExpression::Meta { key: "l4proto" },
                right: Value::from(protocol.as_str()),
            }),
            PacketMatch::TransportHeaderField { offset, len, value } => {
                NftStatement::Match(NftMatch {
                    op: "==",
                    left: NftExpression::Payload {
                        base: "th",
                        offset: offset * 8,
                        len: len * 8,
                    },
                    right: Value::from(*value),
                })
            }
        }
    }
}

impl From<&NatRule> for NftRule {
    fn from(rule: &NatRule) -> Self {
        let mut expr: Vec<NftStatement> = rule.matches.iter().map(NftStatement::from).collect();
        expr.push(NftStatement::Dnat(NftDnat {
            family: rule.chain.table.family.as_str(),
            addr: rule.dnat.addr.to_string(),
            port: rule.dnat.port,
        }));

        Self {
            family: rule.chain.table.family.as_str(),
            table: rule.chain.table.name.clone(),
            chain: rule.chain.name.clone(),
            expr,
        }
    }
}

impl From<&TableRef> for NftTable {
    fn from(table: &TableRef) -> Self {
        Self {
            family: table.family.as_str(),
            name: table.name.clone(),
        }
    }
}

impl From<&FirewallChange> for NftCommand {
    fn from(change: &FirewallChange) -> Self {
        match change {
            FirewallChange::AddTable(table) => NftCommand::Add(NftObject::Table(table.into())),
            FirewallChange::AddChain(spec) => NftCommand::Add(NftObject::Chain(NftChain::base(spec))),
            FirewallChange::FlushChain(chain) => {
                NftCommand::Flush(NftObject::Chain(NftChain::reference(chain)))
            }
            FirewallChange::AddRule(rule) => NftCommand::Add(NftObject::Rule(rule.into())),
            FirewallChange::DeleteChain(chain) => {
                NftCommand::Delete(NftObject::Chain(NftChain::reference(chain)))
            }
        }
    }
}

/// Output of `nft -j list ...`; only chain entries are of interest.
#[derive(Debug, Deserialize)]
pub struct NftListing {
    pub nftables: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub struct ListedChain {
    pub family: String,
    pub table: String,
    pub name: String,
}

impl NftListing {
    pub fn chains(&self) -> impl Iterator<Item = ListedChain> + '_ {
        self.nftables
            .iter()
            .filter_map(|entry| entry.get("chain"))
            .filter_map(|chain| serde_json::from_value(chain.clone()).ok())
    }
}
