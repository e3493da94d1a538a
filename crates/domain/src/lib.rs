//! dnsproxy domain layer
pub mod config;
pub mod errors;
pub mod firewall;
pub mod host_override;
pub mod redirect;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use firewall::{
    ChainHook, ChainRef, ChainSpec, ChainType, DestNat, FirewallChange, NatRule, PacketMatch,
    RuleBatch, TableFamily, TableRef, TransportProtocol,
};
pub use host_override::{HostnameOverride, OverrideValue};
pub use redirect::RedirectTarget;
