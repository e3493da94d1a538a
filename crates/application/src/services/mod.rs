pub mod override_table;

pub use override_table::{build_record, OverrideTable, SENTINEL_ADDRESS, SENTINEL_HOSTNAME};
