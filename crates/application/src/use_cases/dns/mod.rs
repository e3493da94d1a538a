mod handle_dns_query;

pub use handle_dns_query::{encode_uncompressed, HandleDnsQueryUseCase, QueryOutcome};
