pub mod dns;
pub mod firewall;
