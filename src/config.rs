//! Controller settings
//!
//! Loaded from an optional TOML file, then overridden by command-line
//! flags. Every field has a default matching the reference wiring: a
//! Pi 2, heater on GPIO17, MCP3002 CH0 on SPI0 at 244 kHz.
//!
//! ```toml
//! board = "pi4"
//! heater_pin = 17
//! spi_frequency_hz = 244000
//! spi_mode = 0
//! adc_channel = 0
//! interval_ms = 0
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::hal::gpio::MAX_PIN;
use crate::hal::spi::SPI0_PINS;
use crate::hal::{Board, SpiMode};
use crate::sensor::Channel;

/// Default heater output
pub const DEFAULT_HEATER_PIN: u8 = 17;
/// Default SPI clock request
pub const DEFAULT_SPI_FREQUENCY_HZ: u32 = 244_000;

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Board, selecting peripheral base and SPI core clock
    pub board: Board,
    /// GPIO driving the heater
    pub heater_pin: u8,
    /// Requested SPI clock
    pub spi_frequency_hz: u32,
    /// SPI mode 0-3
    pub spi_mode: u8,
    /// MCP3002 input channel 0 or 1
    pub adc_channel: u8,
    /// Delay between samples (0 = as fast as possible)
    pub interval_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board: Board::default(),
            heater_pin: DEFAULT_HEATER_PIN,
            spi_frequency_hz: DEFAULT_SPI_FREQUENCY_HZ,
            spi_mode: 0,
            adc_channel: 0,
            interval_ms: 0,
        }
    }
}

impl Settings {
    /// Read settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject values the hardware layer cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heater_pin > MAX_PIN || SPI0_PINS.contains(&self.heater_pin) {
            return Err(ConfigError::HeaterPin(self.heater_pin));
        }
        if self.spi_frequency_hz == 0 {
            return Err(ConfigError::SpiFrequency);
        }
        if SpiMode::from_index(self.spi_mode).is_none() {
            return Err(ConfigError::SpiMode(self.spi_mode));
        }
        if Channel::from_index(self.adc_channel).is_none() {
            return Err(ConfigError::AdcChannel(self.adc_channel));
        }
        Ok(())
    }

    pub fn spi_mode(&self) -> SpiMode {
        SpiMode::from_index(self.spi_mode).unwrap_or_default()
    }

    pub fn adc_channel(&self) -> Channel {
        Channel::from_index(self.adc_channel).unwrap_or_default()
    }
}
