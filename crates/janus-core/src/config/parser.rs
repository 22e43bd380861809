// Janus Config Parser - TOML with Serde
// Parses the key table and timing settings from TOML

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::mapping::{KeyMappingEntry, KeyMappingTable, MappingError};
use crate::Key;

pub const DEFAULT_HOLD_THRESHOLD_MS: u64 = 300;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 100;
pub const DEFAULT_VIRTUAL_NAME: &str = "janus-key virtual keyboard";

const HOLD_THRESHOLD_RANGE: std::ops::RangeInclusive<u64> = 1..=10_000;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key {0} is configured more than once")]
    DuplicateKey(String),

    #[error("Shared hold function: {0}")]
    SharedSecondary(String),

    #[error("Hold threshold out of range: must be 1-10000ms, got {0}")]
    ThresholdOutOfRange(u64),
}

impl From<MappingError> for ConfigError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::DuplicateKey(key) => ConfigError::DuplicateKey(key.to_string()),
            err @ MappingError::SharedSecondary { .. } => ConfigError::SharedSecondary(err.to_string()),
        }
    }
}

/// Root TOML table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    general: GeneralToml,

    #[serde(default)]
    device: DeviceToml,

    #[serde(default)]
    keys: Vec<KeyToml>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeneralToml {
    hold_threshold_ms: Option<u64>,
    startup_delay_ms: Option<u64>,
    emergency_eject_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceToml {
    path: Option<PathBuf>,
    virtual_name: Option<String>,
}

/// `[[keys]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyToml {
    key: String,
    primary: Option<String>,
    secondary: Option<String>,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub hold_threshold: Duration,
    /// Wait before grabbing, so keys released after launching are not lost
    pub startup_delay: Duration,
    pub emergency_eject_key: Option<Key>,
    /// Keyboard to grab; autodetected when `None`
    pub device_path: Option<PathBuf>,
    pub virtual_name: String,
    /// Mapping entries in file order, physical keys unique
    pub keys: Vec<KeyMappingEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hold_threshold: Duration::from_millis(DEFAULT_HOLD_THRESHOLD_MS),
            startup_delay: Duration::from_millis(DEFAULT_STARTUP_DELAY_MS),
            emergency_eject_key: None,
            device_path: None,
            virtual_name: DEFAULT_VIRTUAL_NAME.to_string(),
            // SPACE taps as itself and holds as LEFTCTRL; CAPSLOCK -> ESC
            keys: vec![
                KeyMappingEntry::janus(Key(57), Key(29)),
                KeyMappingEntry::remap(Key(58), Key(1)),
            ],
        }
    }
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// `$XDG_CONFIG_HOME/janus-key/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("janus-key").join("config.toml"))
    }

    /// Load from the default path, falling back to built-in defaults when
    /// there is no file
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::from_toml_path(path)
            }
            _ => {
                log::info!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Replace the hold threshold, applying the same range check as the file
    pub fn set_hold_threshold_ms(&mut self, ms: u64) -> Result<(), ConfigError> {
        self.hold_threshold = validate_threshold(ms)?;
        Ok(())
    }

    pub fn mapping_table(&self) -> Result<KeyMappingTable, ConfigError> {
        Ok(KeyMappingTable::new(self.keys.iter().copied())?)
    }
}

impl ConfigToml {
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config {
            keys: Vec::with_capacity(self.keys.len()),
            ..Config::default()
        };

        if let Some(ms) = self.general.hold_threshold_ms {
            config.hold_threshold = validate_threshold(ms)?;
        }
        if let Some(ms) = self.general.startup_delay_ms {
            config.startup_delay = Duration::from_millis(ms);
        }
        if let Some(key_str) = &self.general.emergency_eject_key {
            config.emergency_eject_key = Some(parse_key(key_str)?);
        }

        config.device_path = self.device.path.clone();
        if let Some(name) = &self.device.virtual_name {
            config.virtual_name = name.clone();
        }

        for entry in &self.keys {
            let physical = parse_key(&entry.key)?;
            let primary = entry.primary.as_deref().map(parse_key).transpose()?;
            let secondary = entry.secondary.as_deref().map(parse_key).transpose()?;

            if config.keys.iter().any(|k| k.physical == physical) {
                return Err(ConfigError::DuplicateKey(physical.to_string()));
            }
            if primary.is_none() && secondary.is_none() {
                log::warn!("Key {} has neither primary nor secondary, passing it through", physical);
            }

            config.keys.push(KeyMappingEntry {
                physical,
                primary,
                secondary,
            });
        }

        // No [[keys]] at all keeps the built-in table; an empty file is a valid config.
        if self.keys.is_empty() {
            config.keys = Config::default().keys;
        }
        config.mapping_table()?;

        Ok(config)
    }
}

fn validate_threshold(ms: u64) -> Result<Duration, ConfigError> {
    if !HOLD_THRESHOLD_RANGE.contains(&ms) {
        return Err(ConfigError::ThresholdOutOfRange(ms));
    }
    Ok(Duration::from_millis(ms))
}

/// Parse a key name into a Key
fn parse_key(name: &str) -> Result<Key, ConfigError> {
    let trimmed = name.trim();
    crate::key::key_from_name(trimmed).ok_or_else(|| ConfigError::InvalidKey(trimmed.to_string()))
}

/// Commented config file equivalent to `Config::default()`
pub fn default_config_content() -> &'static str {
    r#"# janus-key configuration

[general]
# Press duration after which a dual-function key acts as its hold function
hold_threshold_ms = 300
# Delay before grabbing the keyboard
startup_delay_ms = 100
# Pressing this key stops janus-key
# emergency_eject_key = "PAUSE"

[device]
# Keyboard to grab; the first keyboard found is used when unset
# path = "/dev/input/event3"
virtual_name = "janus-key virtual keyboard"

# Space taps as space and holds as left control
[[keys]]
key = "SPACE"
secondary = "LEFTCTRL"

# Caps Lock becomes Escape
[[keys]]
key = "CAPSLOCK"
primary = "ESC"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("space").unwrap(), Key(57));
        assert_eq!(parse_key(" KEY_LEFTCTRL ").unwrap(), Key(29));
        assert!(parse_key("notakey").is_err());
    }

    #[test]
    fn test_default_content_matches_default() {
        let config = Config::from_toml(default_config_content()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_config_full() {
        let toml = r#"
            [general]
            hold_threshold_ms = 200
            startup_delay_ms = 0
            emergency_eject_key = "pause"

            [device]
            path = "/dev/input/event7"
            virtual_name = "test keyboard"

            [[keys]]
            key = "tab"
            primary = "tab"
            secondary = "leftmeta"

            [[keys]]
            key = "a"
            primary = "b"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.hold_threshold, Duration::from_millis(200));
        assert_eq!(config.startup_delay, Duration::ZERO);
        assert_eq!(config.emergency_eject_key, Some(Key(119)));
        assert_eq!(config.device_path, Some(PathBuf::from("/dev/input/event7")));
        assert_eq!(config.virtual_name, "test keyboard");
        assert_eq!(
            config.keys,
            vec![
                KeyMappingEntry::janus_with_primary(Key(15), Key(15), Key(125)),
                KeyMappingEntry::remap(Key(30), Key(48)),
            ]
        );

        let table = config.mapping_table().unwrap();
        assert!(table.is_janus(Key(15)));
        assert!(!table.is_janus(Key(30)));
    }

    #[test]
    fn test_threshold_out_of_range() {
        for toml in ["[general]\nhold_threshold_ms = 0", "[general]\nhold_threshold_ms = 10001"] {
            let err = Config::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::ThresholdOutOfRange(_)), "{err}");
        }
        assert!(Config::from_toml("[general]\nhold_threshold_ms = 10000").is_ok());
    }

    #[test]
    fn test_set_hold_threshold_override() {
        let mut config = Config::default();
        config.set_hold_threshold_ms(150).unwrap();
        assert_eq!(config.hold_threshold, Duration::from_millis(150));
        assert!(config.set_hold_threshold_ms(0).is_err());
        assert_eq!(config.hold_threshold, Duration::from_millis(150));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let toml = r#"
            [[keys]]
            key = "space"
            secondary = "leftctrl"

            [[keys]]
            key = "KEY_SPACE"
            secondary = "leftalt"
        "#;

        let err = Config::from_toml(toml).unwrap_err();
        assert_eq!(err.to_string(), "Key SPACE is configured more than once");
    }

    #[test]
    fn test_invalid_key() {
        let toml = r#"
            [[keys]]
            key = "space"
            secondary = "not_a_real_key"
        "#;

        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("Invalid key"));
    }

    #[test]
    fn test_out_of_range_key_code_rejected() {
        let toml = r#"
            [[keys]]
            key = "SPACE"
            secondary = "60000"
        "#;

        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(&err, ConfigError::InvalidKey(name) if name == "60000"), "{err}");
    }

    #[test]
    fn test_raw_key_code_accepted() {
        let toml = r#"
            [[keys]]
            key = "SPACE"
            secondary = "183"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.keys, vec![KeyMappingEntry::janus(Key(57), Key(183))]);
    }

    #[test]
    fn test_shared_secondary_rejected() {
        let toml = r#"
            [[keys]]
            key = "space"
            secondary = "leftctrl"

            [[keys]]
            key = "capslock"
            secondary = "leftctrl"
        "#;

        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::SharedSecondary(_)), "{err}");
        assert!(err.to_string().contains("SPACE and CAPSLOCK both hold LEFTCTRL"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [general]
            hold_threshold = 200
        "#;

        assert!(matches!(Config::from_toml(toml), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_toml_path("/nonexistent/janus-key.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
