// Hotrs Config Parser - TOML with Serde
// Parses daemon settings and hotstring rules from TOML files

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::key::key_from_name;
use crate::rule::TriggerRule;
use crate::Key;

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Root TOML table
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    #[serde(default)]
    pub general: Option<GeneralConfig>,

    #[serde(default)]
    pub devices: Option<DevicesConfig>,

    /// Output throttle delays
    #[serde(default)]
    pub delays: Option<DelayConfig>,

    /// Hotstring rules, in enumeration order
    #[serde(default)]
    pub hotstring: Vec<HotstringToml>,
}

/// General settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Start paused
    #[serde(default)]
    pub paused: bool,
    /// Key that toggles pause
    pub pause_key: Option<String>,
    /// Emergency eject key name
    pub emergency_eject_key: Option<String>,
}

/// Device filtering configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Explicit device names/paths to use
    #[serde(default)]
    pub only: Vec<String>,
}

/// Output throttle delays (milliseconds)
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    /// Delay before key output
    pub key_pre_delay_ms: Option<u64>,
    /// Delay after key output
    pub key_post_delay_ms: Option<u64>,
}

/// One `[[hotstring]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotstringToml {
    pub trigger: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub immediate: bool,
    #[serde(default)]
    pub omit_terminator: bool,
}

impl From<HotstringToml> for TriggerRule {
    fn from(entry: HotstringToml) -> Self {
        TriggerRule {
            trigger: entry.trigger,
            replacement: entry.replacement,
            case_sensitive: entry.case_sensitive,
            immediate: entry.immediate,
            omit_terminator: entry.omit_terminator,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Initial pause state
    pub paused: bool,
    /// Key that toggles pause (optional)
    pub pause_key: Option<Key>,
    /// Emergency eject key (optional)
    pub emergency_eject_key: Option<Key>,
    /// Device name/path filter (empty = autodetect keyboards)
    pub device_filter: Vec<String>,
    /// Pre-key output delay in milliseconds
    pub key_pre_delay_ms: Option<u64>,
    /// Post-key output delay in milliseconds
    pub key_post_delay_ms: Option<u64>,
    /// Rules in file order
    pub hotstrings: Vec<TriggerRule>,
}

fn parse_key(name: &str) -> Result<Key, ConfigError> {
    key_from_name(name).ok_or_else(|| ConfigError::InvalidKey(name.to_string()))
}

impl ConfigToml {
    /// Resolve key names and flatten sections
    pub fn to_config(self) -> Result<Config, ConfigError> {
        let general = self.general.unwrap_or_default();
        let delays = self.delays.unwrap_or_default();

        let hotstrings: Vec<TriggerRule> = self.hotstring.into_iter().map(TriggerRule::from).collect();
        for (index, rule) in hotstrings.iter().enumerate() {
            if rule.trigger.is_empty() {
                log::warn!("hotstring #{} has an empty trigger and will never match", index + 1);
            }
        }

        Ok(Config {
            paused: general.paused,
            pause_key: general.pause_key.as_deref().map(parse_key).transpose()?,
            emergency_eject_key: general.emergency_eject_key.as_deref().map(parse_key).transpose()?,
            device_filter: self.devices.map(|d| d.only).unwrap_or_default(),
            key_pre_delay_ms: delays.key_pre_delay_ms,
            key_post_delay_ms: delays.key_post_delay_ms,
            hotstrings,
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        let config = toml_config.to_config()?;
        log::debug!("config: {} hotstrings", config.hotstrings.len());
        Ok(config)
    }

    /// Default location: ~/.config/hotrs/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hotrs").join("config.toml"))
    }

    /// Rules in file order, ready for a `RuleSet`
    pub fn rules(&self) -> Vec<TriggerRule> {
        self.hotstrings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
            [general]
            paused = true
            pause_key = "F12"
            emergency_eject_key = "ejectcd"

            [devices]
            only = ["/dev/input/event3"]

            [delays]
            key_post_delay_ms = 2

            [[hotstring]]
            trigger = "btw"
            replacement = "by the way"

            [[hotstring]]
            trigger = "Hi"
            replacement = "Hello"
            case_sensitive = true
            immediate = true
            omit_terminator = true
            "#,
        )
        .unwrap();

        assert!(config.paused);
        assert_eq!(config.pause_key, Some(Key::from(88)));
        assert_eq!(config.emergency_eject_key, Some(Key::from(161)));
        assert_eq!(config.device_filter, vec!["/dev/input/event3".to_string()]);
        assert_eq!(config.key_pre_delay_ms, None);
        assert_eq!(config.key_post_delay_ms, Some(2));

        let rules = config.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], TriggerRule::new("btw", "by the way"));
        assert_eq!(
            rules[1],
            TriggerRule::new("Hi", "Hello")
                .case_sensitive(true)
                .immediate(true)
                .omit_terminator(true)
        );
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(!config.paused);
        assert!(config.pause_key.is_none());
        assert!(config.device_filter.is_empty());
        assert!(config.hotstrings.is_empty());
    }

    #[test]
    fn test_replacement_defaults_to_empty() {
        let config = Config::from_toml(
            r#"
            [[hotstring]]
            trigger = "zz"
            "#,
        )
        .unwrap();
        assert_eq!(config.hotstrings[0].replacement, "");
    }

    #[test]
    fn test_empty_trigger_is_accepted() {
        let config = Config::from_toml(
            r#"
            [[hotstring]]
            trigger = ""
            replacement = "never"
            "#,
        )
        .unwrap();
        assert_eq!(config.hotstrings.len(), 1);
    }

    #[test]
    fn test_invalid_key_name() {
        let err = Config::from_toml(
            r#"
            [general]
            pause_key = "NOT_A_KEY"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidKey(name) if name == "NOT_A_KEY"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = Config::from_toml(
            r#"
            [[hotstring]]
            trigger = "a"
            replacment = "typo"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_from_missing_path_is_io_error() {
        let err = Config::from_toml_path("/nonexistent/hotrs/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with("hotrs/config.toml"));
        }
    }
}
