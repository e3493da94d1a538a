pub mod dns;
pub mod lifecycle;
pub mod signal;

pub use dns::{bind_dns_listeners, start_dns_server};
pub use lifecycle::run_with_redirect;
pub use signal::ShutdownSignals;
