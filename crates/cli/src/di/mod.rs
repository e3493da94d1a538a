mod dns;
mod firewall;

pub use dns::DnsServices;
pub use firewall::build_redirector;
