//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::control::scr::{ScrConfig, ScrNorm, IF_MAX_MHZ, IF_MIN_MHZ};
use crate::error::{DiseqcError, Result};
use crate::lnb::{mhz_to_khz, LnbParams};
use crate::satellite::{encode_orbital_position, Direction, SatellitePosition, SatelliteTable};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub frontend: FrontendConfig,

    #[serde(default)]
    pub lnb: LnbConfig,

    #[serde(default)]
    pub switch: SwitchConfig,

    /// Present only on Unicable installations
    #[serde(default)]
    pub scr: Option<ScrSection>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub satellites: Vec<SatelliteEntry>,
}

/// DVB frontend selection
#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    #[serde(default)]
    pub adapter: u32,

    #[serde(default)]
    pub frontend: u32,

    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

/// LNB type and optional oscillator overrides
#[derive(Debug, Deserialize, Clone)]
pub struct LnbConfig {
    #[serde(rename = "type", default = "default_lnb_type")]
    pub lnb_type: String,

    #[serde(default)]
    pub low_mhz: Option<u32>,

    #[serde(default)]
    pub high_mhz: Option<u32>,

    #[serde(default)]
    pub switch_mhz: Option<u32>,
}

/// DiSEqC 1.0/1.1 switch ports
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SwitchConfig {
    /// Committed switch position (0-3)
    #[serde(default)]
    pub committed: i32,

    /// Uncommitted switch port (0-15)
    #[serde(default)]
    pub uncommitted: i32,
}

/// Unicable user band
#[derive(Debug, Deserialize, Clone)]
pub struct ScrSection {
    pub slot: u8,

    /// User band center frequency, MHz
    pub user_frequency: u16,

    /// Satellite position letter: `A`/`B` (EN 50494) or `a`-`p` (EN 50607)
    #[serde(default = "default_scr_position")]
    pub position: String,

    #[serde(default)]
    pub pin: Option<u16>,

    #[serde(default = "default_scr_repeat")]
    pub repeat: u32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// One `[[satellites]]` entry
#[derive(Debug, Deserialize, Clone)]
pub struct SatelliteEntry {
    pub name: String,

    /// Tenths of a degree, e.g. 192 for 19.2
    pub orbital_position: u16,

    pub direction: Direction,

    pub rotor_position: u8,
}

// Default value functions
fn default_reply_timeout_ms() -> u64 { 150 }

fn default_lnb_type() -> String { "universal".to_string() }

fn default_scr_position() -> String { "A".to_string() }
fn default_scr_repeat() -> u32 { 2 }

fn default_log_level() -> String { "info".to_string() }

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            adapter: 0,
            frontend: 0,
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl Default for LnbConfig {
    fn default() -> Self {
        Self {
            lnb_type: default_lnb_type(),
            low_mhz: None,
            high_mhz: None,
            switch_mhz: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> DiseqcError {
    DiseqcError::Config(toml::de::Error::custom(message))
}

fn override_khz(field: &str, mhz: u32) -> Result<u32> {
    mhz_to_khz(mhz).ok_or_else(|| invalid(format!("lnb {} = {} is out of range", field, mhz)))
}

impl FrontendConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl LnbConfig {
    /// Preset oscillators with the MHz overrides applied
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown LNB type or an override too large to
    /// express in kHz
    pub fn params(&self) -> Result<LnbParams> {
        let mut params = LnbParams::preset(&self.lnb_type)
            .ok_or_else(|| invalid(format!("unknown LNB type '{}'", self.lnb_type)))?;

        if let Some(low) = self.low_mhz {
            params.low_khz = override_khz("low_mhz", low)?;
        }
        if let Some(high) = self.high_mhz {
            params.high_khz = override_khz("high_mhz", high)?;
        }
        if let Some(switch) = self.switch_mhz {
            params.switch_khz = override_khz("switch_mhz", switch)?;
        }
        Ok(params)
    }
}

impl ScrSection {
    /// Routing setup for the control layer
    ///
    /// # Errors
    ///
    /// Returns `FatalConfig` for an unknown position letter
    pub fn scr_config(&self) -> Result<ScrConfig> {
        let mut letters = self.position.chars();
        let letter = match (letters.next(), letters.next()) {
            (Some(letter), None) => letter,
            _ => {
                return Err(DiseqcError::FatalConfig(format!(
                    "SCR position must be a single letter, got '{}'",
                    self.position
                )))
            }
        };

        let mut config = ScrConfig::from_position_letter(self.slot, self.user_frequency, letter, None)?;
        config.pin = self.pin.unwrap_or(ScrConfig::NO_PIN);
        Ok(config)
    }
}

impl SatelliteEntry {
    pub fn to_position(&self) -> SatellitePosition {
        SatellitePosition::new(
            self.name.clone(),
            encode_orbital_position(self.orbital_position),
            self.direction,
            self.rotor_position,
        )
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use diseqc_ctl::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Satellite table keyed by rotor position
    pub fn satellite_table(&self) -> SatelliteTable {
        SatelliteTable::new(self.satellites.iter().map(SatelliteEntry::to_position).collect())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.frontend.reply_timeout_ms == 0 || self.frontend.reply_timeout_ms > 1000 {
            return Err(invalid("reply_timeout_ms must be between 1 and 1000"));
        }

        let lnb = self.lnb.params()?;
        if lnb.low_khz == 0 {
            return Err(invalid("LNB low oscillator cannot be 0"));
        }
        if lnb.switch_khz > 0 && lnb.high_khz == 0 {
            return Err(invalid("LNB switch frequency set without a high oscillator"));
        }

        if !(0..=3).contains(&self.switch.committed) {
            return Err(invalid("switch committed must be between 0 and 3"));
        }
        if !(0..=15).contains(&self.switch.uncommitted) {
            return Err(invalid("switch uncommitted must be between 0 and 15"));
        }

        if let Some(scr) = &self.scr {
            self.validate_scr(scr)?;
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging level must be one of: trace, debug, info, warn, error",
            ));
        }

        for (i, sat) in self.satellites.iter().enumerate() {
            if sat.name.is_empty() {
                return Err(invalid(format!("satellite #{} has an empty name", i)));
            }
            if sat.orbital_position > 1800 {
                return Err(invalid(format!(
                    "satellite {} orbital_position {} exceeds 1800 (180.0 degrees)",
                    sat.name, sat.orbital_position
                )));
            }
            if self.satellites[..i]
                .iter()
                .any(|other| other.rotor_position == sat.rotor_position)
            {
                return Err(invalid(format!(
                    "rotor_position {} is used by more than one satellite",
                    sat.rotor_position
                )));
            }
        }

        Ok(())
    }

    fn validate_scr(&self, scr: &ScrSection) -> Result<()> {
        let config = scr.scr_config().map_err(|e| invalid(e.to_string()))?;
        let norm = ScrNorm::try_from(config.norm).map_err(|e| invalid(e.to_string()))?;

        if scr.slot > norm.max_slot() {
            return Err(invalid(format!(
                "scr slot must be between 0 and {} for position '{}'",
                norm.max_slot(),
                scr.position
            )));
        }

        if !(IF_MIN_MHZ..=IF_MAX_MHZ).contains(&(scr.user_frequency as u32)) {
            return Err(invalid("scr user_frequency must be between 950 and 2150"));
        }

        if let Some(pin) = scr.pin {
            if pin > 255 {
                return Err(invalid("scr pin must be between 0 and 255"));
            }
        }

        if scr.repeat == 0 || scr.repeat > 5 {
            return Err(invalid("scr repeat must be between 1 and 5"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            scr: Some(ScrSection {
                slot: 1,
                user_frequency: 1210,
                position: default_scr_position(),
                pin: None,
                repeat: default_scr_repeat(),
            }),
            satellites: vec![SatelliteEntry {
                name: "S19E2".to_string(),
                orbital_position: 192,
                direction: Direction::East,
                rotor_position: 1,
            }],
            ..Config::default()
        }
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frontend.reply_timeout(), Duration::from_millis(150));
        assert_eq!(config.lnb.params().unwrap(), LnbParams::UNIVERSAL);
        assert!(config.scr.is_none());
    }

    #[test]
    fn test_valid_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_file = write_config(
            r#"
[frontend]
adapter = 1
frontend = 0

[lnb]
type = "universal"

[switch]
committed = 2
uncommitted = 4

[scr]
slot = 3
user_frequency = 1284
position = "b"
pin = 42

[logging]
level = "debug"

[[satellites]]
name = "S19E2"
orbital_position = 192
direction = "east"
rotor_position = 1

[[satellites]]
name = "S30W0"
orbital_position = 300
direction = "west"
rotor_position = 2
"#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.frontend.adapter, 1);
        assert_eq!(config.switch.committed, 2);
        assert_eq!(config.switch.uncommitted, 4);
        assert_eq!(config.logging.level, "debug");

        let scr = config.scr.as_ref().unwrap();
        assert_eq!(scr.repeat, 2);
        let scr = scr.scr_config().unwrap();
        assert_eq!((scr.norm, scr.slot, scr.position, scr.pin()), (2, 3, 0x04, Some(42)));

        assert_eq!(config.satellites.len(), 2);
        assert_eq!(config.satellites[1].direction, Direction::West);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = write_config("");
        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.frontend.adapter, 0);
        assert_eq!(config.lnb.lnb_type, "universal");
        assert!(config.satellites.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/diseqc-ctl.toml");
        assert!(matches!(result, Err(DiseqcError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_file = write_config("[frontend\nadapter = ");
        assert!(matches!(Config::load(temp_file.path()), Err(DiseqcError::Config(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let temp_file = write_config("[switch]\ncommitted = 4\n");
        assert!(matches!(Config::load(temp_file.path()), Err(DiseqcError::Config(_))));
    }

    #[test]
    fn test_reply_timeout_zero() {
        let mut config = create_valid_config();
        config.frontend.reply_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reply_timeout_too_high() {
        let mut config = create_valid_config();
        config.frontend.reply_timeout_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_lnb_type() {
        let mut config = create_valid_config();
        config.lnb.lnb_type = "ka-band".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lnb_overrides() {
        let lnb = LnbConfig {
            lnb_type: "universal".to_string(),
            low_mhz: Some(9750),
            high_mhz: Some(10750),
            switch_mhz: Some(11800),
        };
        assert_eq!(lnb.params().unwrap(), LnbParams::new(9_750_000, 10_750_000, 11_800_000));
    }

    #[test]
    fn test_lnb_override_too_large() {
        let mut config = create_valid_config();
        config.lnb.low_mhz = Some(5_000_000);
        assert!(matches!(config.validate(), Err(DiseqcError::Config(_))));

        let mut config = create_valid_config();
        config.lnb.switch_mhz = Some(u32::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lnb_switch_without_high_oscillator() {
        let mut config = create_valid_config();
        config.lnb.lnb_type = "standard".to_string();
        config.lnb.switch_mhz = Some(11700);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_committed_out_of_range() {
        let mut config = create_valid_config();
        config.switch.committed = 4;
        assert!(config.validate().is_err());
        config.switch.committed = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_uncommitted_out_of_range() {
        let mut config = create_valid_config();
        config.switch.uncommitted = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scr_unknown_position_letter() {
        let mut config = create_valid_config();
        config.scr.as_mut().unwrap().position = "Z".to_string();
        assert!(config.validate().is_err());

        config.scr.as_mut().unwrap().position = "ab".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scr_slot_depends_on_revision() {
        let mut config = create_valid_config();
        config.scr.as_mut().unwrap().slot = 8;
        assert!(config.validate().is_err());

        // EN 50607 addresses 32 slots
        config.scr.as_mut().unwrap().position = "a".to_string();
        assert!(config.validate().is_ok());

        config.scr.as_mut().unwrap().slot = 32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scr_user_frequency_out_of_range() {
        let mut config = create_valid_config();
        config.scr.as_mut().unwrap().user_frequency = 900;
        assert!(config.validate().is_err());
        config.scr.as_mut().unwrap().user_frequency = 2200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scr_pin_too_high() {
        let mut config = create_valid_config();
        config.scr.as_mut().unwrap().pin = Some(256);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scr_repeat_out_of_range() {
        let mut config = create_valid_config();
        config.scr.as_mut().unwrap().repeat = 0;
        assert!(config.validate().is_err());
        config.scr.as_mut().unwrap().repeat = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_rotor_position() {
        let mut config = create_valid_config();
        config.satellites.push(SatelliteEntry {
            name: "S13E0".to_string(),
            orbital_position: 130,
            direction: Direction::East,
            rotor_position: 1,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_orbital_position_too_high() {
        let mut config = create_valid_config();
        config.satellites[0].orbital_position = 1801;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_satellite_table_uses_packed_decimal() {
        let mut config = create_valid_config();
        config.satellites.push(SatelliteEntry {
            name: "S30W0".to_string(),
            orbital_position: 300,
            direction: Direction::West,
            rotor_position: 2,
        });

        let table = config.satellite_table();
        let sat = table.by_name("S30W0").unwrap();

        assert_eq!(sat.orbital_position, 0x0300);
        assert!((sat.angle() - 330.0).abs() < 1e-9);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_reply_timeout_ms(), 150);
        assert_eq!(default_lnb_type(), "universal");
        assert_eq!(default_scr_repeat(), 2);
        assert_eq!(default_log_level(), "info");
    }
}
