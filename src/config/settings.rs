//! Settings loading from config.toml
//!
//! This module loads the lead lifecycle settings and the pricing tiers used to
//! seed an empty tier table. Every section is optional; a missing file yields
//! the defaults, a malformed one is a configuration error.

use crate::errors::{Error, Result};
use chrono::TimeDelta;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const MAX_EXPIRY_DAYS: i64 = 365;
const MAX_ABANDON_AFTER_HOURS: i64 = 24 * 90;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Lead lifecycle settings
    #[serde(default)]
    pub leads: LeadSettings,
    /// Pricing tiers to seed
    #[serde(default)]
    pub pricing_tiers: Vec<TierConfig>,
}

/// Timings applied to leads as they move through their lifecycle
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LeadSettings {
    /// Days a submitted lead stays sellable
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    /// Hours after which an unfinished survey counts as abandoned
    #[serde(default = "default_abandon_after_hours")]
    pub abandon_after_hours: i64,
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            abandon_after_hours: default_abandon_after_hours(),
        }
    }
}

impl LeadSettings {
    /// Checks both timings are positive and within their bounds.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        self.expiry()?;
        self.abandon_after()?;
        Ok(())
    }

    /// How long a submitted lead stays sellable.
    ///
    /// # Errors
    /// Returns `Error::Config` unless `expiry_days` is in `1..=365`.
    pub fn expiry(&self) -> Result<TimeDelta> {
        bounded("leads.expiry_days", self.expiry_days, MAX_EXPIRY_DAYS)
            .and_then(|days| TimeDelta::try_days(days).ok_or_else(|| out_of_range("leads.expiry_days", days)))
    }

    /// How old an unfinished survey must be before it is abandoned.
    ///
    /// # Errors
    /// Returns `Error::Config` unless `abandon_after_hours` is in `1..=2160`.
    pub fn abandon_after(&self) -> Result<TimeDelta> {
        bounded(
            "leads.abandon_after_hours",
            self.abandon_after_hours,
            MAX_ABANDON_AFTER_HOURS,
        )
        .and_then(|hours| {
            TimeDelta::try_hours(hours).ok_or_else(|| out_of_range("leads.abandon_after_hours", hours))
        })
    }
}

fn out_of_range(field: &str, value: i64) -> Error {
    Error::Config {
        message: format!("{field} = {value} is out of range"),
    }
}

fn bounded(field: &str, value: i64, max: i64) -> Result<i64> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Config {
            message: format!("{field} must be between 1 and {max}, got {value}"),
        })
    }
}

const fn default_expiry_days() -> i64 {
    14
}

const fn default_abandon_after_hours() -> i64 {
    72
}

/// Configuration for a single pricing tier
#[derive(Debug, Deserialize, Clone)]
pub struct TierConfig {
    /// Display name
    pub name: String,
    /// Lower volume bound in cubic metres
    pub min_cbm: f64,
    /// Upper volume bound; omitted means unbounded
    pub max_cbm: Option<f64>,
    /// Flat lead price in pence
    pub price_pence: i64,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
/// - A lead timing is zero, negative or too large
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.leads.validate()?;
    Ok(config)
}

/// Loads configuration from `PRIMEHAUL_CONFIG` (default `./config.toml`),
/// falling back to defaults when the file does not exist.
pub fn load_default_config() -> Result<Config> {
    let path =
        std::env::var("PRIMEHAUL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        info!("No config file at {}, using defaults.", path);
        return Ok(Config::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [leads]
            expiry_days = 7

            [[pricing_tiers]]
            name = "Small"
            min_cbm = 0.0
            max_cbm = 30.0
            price_pence = 1500

            [[pricing_tiers]]
            name = "Large"
            min_cbm = 30.0
            price_pence = 3000
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.leads.expiry_days, 7);
        assert_eq!(config.leads.abandon_after_hours, 72);
        assert_eq!(config.pricing_tiers.len(), 2);
        assert_eq!(config.pricing_tiers[0].max_cbm, Some(30.0));
        assert!(config.pricing_tiers[1].max_cbm.is_none());
        assert_eq!(config.pricing_tiers[1].price_pence, 3000);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.leads.expiry_days, 14);
        assert!(config.pricing_tiers.is_empty());
    }

    #[test]
    fn test_lead_timings_are_validated() {
        for bad in [
            "[leads]\nexpiry_days = -1",
            "[leads]\nexpiry_days = 0",
            "[leads]\nexpiry_days = 9223372036854775",
            "[leads]\nabandon_after_hours = -72",
            "[leads]\nabandon_after_hours = 9223372036854775807",
        ] {
            let result = parse_config(bad);
            assert!(matches!(result, Err(Error::Config { .. })), "{bad} was accepted");
        }

        let config = parse_config("[leads]\nexpiry_days = 365\nabandon_after_hours = 1").unwrap();
        assert_eq!(config.leads.expiry().unwrap(), TimeDelta::days(365));
        assert_eq!(config.leads.abandon_after().unwrap(), TimeDelta::hours(1));
    }

    #[test]
    fn test_default_timings_are_valid() {
        let settings = LeadSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.expiry().unwrap(), TimeDelta::days(14));
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
