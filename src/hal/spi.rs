//! BCM283x SPI0 master driver
//!
//! Polled, one byte per exchange, chip select CE0.
//!
//! | Function | BCM GPIO |
//! |----------|----------|
//! | CE0      | GPIO 8   |
//! | MISO     | GPIO 9   |
//! | MOSI     | GPIO 10  |
//! | SCLK     | GPIO 11  |

use std::hint;

use super::gpio::{Function, Gpio};
use super::mapper::Region;
use crate::error::{HalError, HalResult};

/// GPIOs routed to SPI0 by ALT0
pub const SPI0_PINS: [u8; 4] = [8, 9, 10, 11];

/// SPI register word indices
mod regs {
    pub const CS: usize = 0; // Control and Status
    pub const FIFO: usize = 1; // TX and RX FIFOs
    pub const CLK: usize = 2; // Clock Divider
}

/// CS register bits
pub mod cs_bits {
    /// Clock phase
    pub const CPHA: u32 = 1 << 2;
    /// Clock polarity
    pub const CPOL: u32 = 1 << 3;
    /// Transfer active
    pub const TA: u32 = 1 << 7;
    /// Transfer done
    pub const DONE: u32 = 1 << 16;
}

/// SPI mode (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    pub fn from_index(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(SpiMode::Mode0),
            1 => Some(SpiMode::Mode1),
            2 => Some(SpiMode::Mode2),
            3 => Some(SpiMode::Mode3),
            _ => None,
        }
    }

    /// CS register bits for this mode
    pub fn flags(self) -> u32 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => cs_bits::CPHA,
            SpiMode::Mode2 => cs_bits::CPOL,
            SpiMode::Mode3 => cs_bits::CPOL | cs_bits::CPHA,
        }
    }
}

/// SPI clock and control configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    core_clock_hz: u32,
    divisor: u32,
    flags: u32,
}

impl SpiConfig {
    /// Derive the divisor for `frequency_hz` from the core clock
    ///
    /// The divisor truncates, so the realized clock can differ from the
    /// request; see [`SpiConfig::realized_hz`].
    pub fn new(core_clock_hz: u32, frequency_hz: u32, flags: u32) -> HalResult<Self> {
        if frequency_hz == 0 {
            return Err(HalError::InvalidFrequency);
        }
        Ok(Self {
            core_clock_hz,
            divisor: (core_clock_hz / frequency_hz).max(1),
            flags,
        })
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Clock the bus will actually run at
    pub fn realized_hz(&self) -> u32 {
        self.core_clock_hz / self.divisor
    }
}

/// Full-duplex single-byte bus exchange
pub trait SpiBus {
    /// Send `byte` and return the byte clocked in at the same time
    fn exchange(&mut self, byte: u8) -> u8;
}

/// SPI0 driver
#[derive(Debug)]
pub struct Spi {
    regs: Region,
}

impl Spi {
    /// Route SPI0 pins, program the clock and flags, then start the transfer
    pub fn init(regs: Region, gpio: &mut Gpio, config: &SpiConfig) -> Self {
        let mut spi = Self { regs };

        for pin in SPI0_PINS {
            gpio.set_mode(pin, Function::Alt0);
        }

        spi.regs.write(regs::CLK, config.divisor());
        spi.regs.write(regs::CS, config.flags());
        spi.regs.modify(regs::CS, |cs| cs | cs_bits::TA);

        log::info!(
            "SPI0 clock {} Hz (divisor {})",
            config.realized_hz(),
            config.divisor()
        );
        spi
    }

    #[cfg(test)]
    pub(crate) fn regs_mut(&mut self) -> &mut Region {
        &mut self.regs
    }
}

impl SpiBus for Spi {
    fn exchange(&mut self, byte: u8) -> u8 {
        self.regs.write(regs::FIFO, u32::from(byte));
        while self.regs.read(regs::CS) & cs_bits::DONE == 0 {
            hint::spin_loop();
        }
        self.regs.read(regs::FIFO) as u8
    }
}
