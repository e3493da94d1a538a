//! dnsproxy application layer: ports, the override table and the use cases
//! driving query dispatch and traffic redirection.
pub mod ports;
pub mod services;
pub mod use_cases;
