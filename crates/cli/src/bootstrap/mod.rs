mod config;
mod logging;

pub use config::{load_config, pick_free_port};
pub use logging::init_logging;
