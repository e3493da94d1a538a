pub mod server;
pub mod transport;

pub use server::{DnsListenerSet, DnsServerHandler};
pub use transport::TlsTransport;
