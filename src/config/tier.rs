//! Product tier configuration loading from config.toml
//!
//! The tier decides how many expenses may be added per day. It is fixed for the
//! lifetime of a process: read once at startup from `config.toml`, optionally
//! overridden by the `MAX_DAILY_ENTRIES` and `IS_PAID_VERSION` environment
//! variables, and then handed to [`crate::core::admission::AdmissionPolicy`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Daily entry limit of the free tier
pub const FREE_TIER_MAX_DAILY_ENTRIES: u32 = 10;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Product tier settings
    #[serde(default)]
    pub tier: TierConfig,
}

/// Free/paid product tier
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    /// Maximum number of expenses that may be added per calendar day
    #[serde(default = "default_max_daily_entries")]
    pub max_daily_entries: u32,
    /// Paid builds are never limited
    #[serde(default)]
    pub is_paid_version: bool,
}

const fn default_max_daily_entries() -> u32 {
    FREE_TIER_MAX_DAILY_ENTRIES
}

impl TierConfig {
    /// The free tier: ten entries per day.
    #[must_use]
    pub const fn free() -> Self {
        Self {
            max_daily_entries: FREE_TIER_MAX_DAILY_ENTRIES,
            is_paid_version: false,
        }
    }

    /// The paid tier: no practical daily limit.
    #[must_use]
    pub const fn paid() -> Self {
        Self {
            max_daily_entries: u32::MAX,
            is_paid_version: true,
        }
    }
}

impl TierConfig {
    /// Rejects a free tier whose daily limit is zero.
    ///
    /// # Errors
    /// `Error::Config` if `max_daily_entries` is 0 and the tier is not paid.
    pub fn validate(&self) -> Result<()> {
        if !self.is_paid_version && self.max_daily_entries == 0 {
            return Err(Error::Config {
                message: "max_daily_entries must be a positive integer for the free tier"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self::free()
    }
}

impl Config {
    /// Applies `MAX_DAILY_ENTRIES` / `IS_PAID_VERSION` overrides.
    ///
    /// `lookup` resolves a variable name to its value; `main` passes
    /// `std::env::var`, tests pass a closure.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MAX_DAILY_ENTRIES") {
            let max = raw.trim().parse::<u32>().map_err(|e| Error::Config {
                message: format!("MAX_DAILY_ENTRIES must be a positive integer: {e}"),
            })?;
            self.tier.max_daily_entries = max;
        }

        if let Some(raw) = lookup("IS_PAID_VERSION") {
            let paid = raw.trim().parse::<bool>().map_err(|e| Error::Config {
                message: format!("IS_PAID_VERSION must be true or false: {e}"),
            })?;
            self.tier.is_paid_version = paid;
        }

        self.tier.validate()?;
        Ok(self)
    }
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
/// - The free tier's daily limit is zero
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.tier.validate()?;
    Ok(config)
}

/// Loads the configuration from ./config.toml (free tier if the file is absent)
/// and applies environment overrides.
pub fn load_default_config() -> Result<Config> {
    let path = Path::new("config.toml");
    let config = if path.exists() {
        load_config(path)?
    } else {
        info!("No config.toml found, using free tier defaults");
        Config::default()
    };

    let config = config.apply_overrides(|key| std::env::var(key).ok())?;
    info!(
        max_daily_entries = config.tier.max_daily_entries,
        is_paid_version = config.tier.is_paid_version,
        "Tier configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_tier_config() {
        let toml_str = r"
            [tier]
            max_daily_entries = 25
            is_paid_version = false
        ";

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tier.max_daily_entries, 25);
        assert!(!config.tier.is_paid_version);
    }

    #[test]
    fn test_missing_fields_default_to_free_tier() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tier, TierConfig::free());

        let config: Config = toml::from_str("[tier]\nis_paid_version = true").unwrap();
        assert_eq!(config.tier.max_daily_entries, FREE_TIER_MAX_DAILY_ENTRIES);
        assert!(config.tier.is_paid_version);
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env: HashMap<&str, &str> =
            HashMap::from([("MAX_DAILY_ENTRIES", "3"), ("IS_PAID_VERSION", "true")]);

        let config = Config::default()
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();
        assert_eq!(config.tier.max_daily_entries, 3);
        assert!(config.tier.is_paid_version);
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let result = Config::default()
            .apply_overrides(|key| (key == "MAX_DAILY_ENTRIES").then(|| "lots".to_string()));
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }

    #[test]
    fn test_zero_daily_limit_is_config_error() {
        let result = Config::default()
            .apply_overrides(|key| (key == "MAX_DAILY_ENTRIES").then(|| "0".to_string()));
        assert!(matches!(result, Err(Error::Config { message: _ })));

        let path = std::env::temp_dir().join(format!("tier-zero-{}.toml", std::process::id()));
        std::fs::write(&path, "[tier]\nmax_daily_entries = 0\n").unwrap();
        let result = load_config(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::Config { message: _ })));

        // A paid tier never consults the limit.
        let env: HashMap<&str, &str> =
            HashMap::from([("MAX_DAILY_ENTRIES", "0"), ("IS_PAID_VERSION", "true")]);
        let config = Config::default()
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();
        assert!(config.tier.is_paid_version);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
