pub mod dns;
pub mod redirect;

pub use dns::{HandleDnsQueryUseCase, QueryOutcome};
pub use redirect::{Redirector, RedirectorState};
