use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

impl TransportProtocol {
    pub const ALL: [TransportProtocol; 2] = [TransportProtocol::Tcp, TransportProtocol::Udp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the IPv4 family is redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TableFamily {
    #[default]
    Ip,
}

impl TableFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ip => "ip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub family: TableFamily,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainRef {
    pub table: TableRef,
    pub name: String,
}

impl fmt::Display for ChainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.table.family.as_str(),
            self.table.name,
            self.name
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    Nat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainHook {
    Output,
}

/// Base chain definition used when creating the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    pub chain: ChainRef,
    pub chain_type: ChainType,
    pub hook: ChainHook,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketMatch {
    /// Layer 4 protocol of the packet.
    L4Proto(TransportProtocol),
    /// Raw big-endian field of the transport header. Offset and length are bytes.
    TransportHeaderField { offset: u32, len: u32, value: u16 },
}

/// Destination NAT to an IPv4 address and port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestNat {
    pub addr: Ipv4Addr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatRule {
    pub chain: ChainRef,
    pub matches: Vec<PacketMatch>,
    pub dnat: DestNat,
}

impl NatRule {
    pub fn protocol(&self) -> Option<TransportProtocol> {
        self.matches.iter().find_map(|m| match m {
            PacketMatch::L4Proto(proto) => Some(*proto),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallChange {
    AddTable(TableRef),
    AddChain(ChainSpec),
    FlushChain(ChainRef),
    AddRule(NatRule),
    DeleteChain(ChainRef),
}

/// Ordered set of changes committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleBatch {
    changes: Vec<FirewallChange>,
}

impl RuleBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: FirewallChange) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn changes(&self) -> &[FirewallChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &NatRule> {
        self.changes.iter().filter_map(|c| match c {
            FirewallChange::AddRule(rule) => Some(rule),
            _ => None,
        })
    }
}
