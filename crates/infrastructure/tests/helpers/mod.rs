#![allow(dead_code, unused_imports)]

mod dns_client;
mod dot_server_mock;
mod fake_nft;

pub use dns_client::{query_bytes, tcp_query, udp_query, StaticUpstream};
pub use dot_server_mock::{DotBehavior, MockDotServer};
pub use fake_nft::FakeNft;
