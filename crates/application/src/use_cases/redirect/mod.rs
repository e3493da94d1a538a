mod redirector;

pub use redirector::{Redirector, RedirectorState};
