//! Error types
//!
//! Hardware access failures are fatal to the controller; configuration
//! errors are reported before any register is touched.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while gaining or configuring register access
#[derive(Debug, Error)]
pub enum HalError {
    /// The memory device could not be opened (usually missing root)
    #[error("can't open {}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// mmap refused the register window
    #[error("mmap of peripheral block {base:#010x} failed")]
    Map {
        base: usize,
        #[source]
        source: io::Error,
    },

    /// The requested window overlaps one that is already mapped
    #[error("peripheral window {base:#010x}+{size:#x} overlaps an existing mapping")]
    Overlap { base: usize, size: usize },

    /// GPIO pin outside 0-53
    #[error("bad pin, got pin {0}")]
    InvalidPin(u8),

    /// SPI clock of 0 Hz requested
    #[error("SPI frequency must be non-zero")]
    InvalidFrequency,
}

/// Invalid operator input or settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Target temperature is not an integer
    #[error("target temperature {0:?} is not an integer")]
    InvalidTarget(String),

    /// Target temperature outside the supported band
    #[error("target temperature {value} is outside {min}..={max}")]
    TargetOutOfRange { value: i64, min: u32, max: u32 },

    /// Heater pin unusable
    #[error("heater pin {0} must be in 0..=53 and not one of the SPI0 pins 8-11")]
    HeaterPin(u8),

    /// SPI frequency of 0 Hz
    #[error("spi_frequency_hz must be greater than zero")]
    SpiFrequency,

    /// SPI mode above 3
    #[error("spi_mode {0} is not one of 0, 1, 2, 3")]
    SpiMode(u8),

    /// ADC channel above 1
    #[error("adc_channel {0} is not 0 or 1")]
    AdcChannel(u8),

    /// Settings file could not be read
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Settings file is not valid TOML for [`crate::config::Settings`]
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures installing the shutdown hook
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("a shutdown hook is already installed")]
    AlreadyInstalled,

    #[error("sigaction failed for signal {signal}")]
    Register {
        signal: i32,
        #[source]
        source: io::Error,
    },
}

/// Result type for hardware operations
pub type HalResult<T> = Result<T, HalError>;
