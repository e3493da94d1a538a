#![allow(dead_code, unused_imports)]

mod mock_ports;
pub mod messages;

pub use mock_ports::{InMemoryFirewall, MockUpstream, UpstreamBehavior};
