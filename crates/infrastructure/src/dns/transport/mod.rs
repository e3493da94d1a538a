pub mod tcp;
pub mod tls;

pub use tls::TlsTransport;
