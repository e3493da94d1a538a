mod firewall_port;
mod upstream_exchanger;

pub use firewall_port::FirewallPort;
pub use upstream_exchanger::UpstreamExchanger;
