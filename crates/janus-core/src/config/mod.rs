// Janus Config
// TOML configuration for the key table and timing

pub mod parser;

pub use parser::{
    default_config_content, Config, ConfigError, DEFAULT_HOLD_THRESHOLD_MS, DEFAULT_STARTUP_DELAY_MS,
    DEFAULT_VIRTUAL_NAME,
};
