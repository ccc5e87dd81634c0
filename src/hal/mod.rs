//! Hardware Abstraction Layer for BCM283x / BCM2711
//!
//! Userspace drivers over `/dev/mem` for:
//! - GPIO pin control
//! - System timer (free-running counter, busy-wait delays)
//! - SPI0 master
//!
//! Only [`mapper::Region`] and [`gpio::Switch`] touch raw register memory;
//! everything above them uses named operations.

pub mod gpio;
pub mod mapper;
pub mod spi;
pub mod timer;

pub use gpio::{Function, Gpio, Switch};
pub use mapper::{PeripheralMapper, Region, BLOCK_SIZE};
pub use spi::{Spi, SpiBus, SpiConfig, SpiMode};
pub use timer::SystemTimer;

use clap::ValueEnum;
use serde::Deserialize;

/// Offset of the GPIO block from the peripheral base
pub const GPIO_OFFSET: usize = 0x20_0000;
/// Offset of the system timer block from the peripheral base
pub const SYS_TIMER_OFFSET: usize = 0x3000;
/// Offset of the SPI0 block from the peripheral base
pub const SPI0_OFFSET: usize = 0x20_4000;

/// Supported boards, keyed by SoC peripheral layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Board {
    /// Raspberry Pi 1 / Zero (BCM2835)
    Pi1,
    /// Raspberry Pi 2 and 3 (BCM2836 / BCM2837)
    #[default]
    Pi2,
    /// Raspberry Pi 4 (BCM2711, low peripheral mode)
    Pi4,
}

impl Board {
    /// ARM physical address of the peripheral window
    pub const fn peripheral_base(self) -> usize {
        match self {
            Board::Pi1 => 0x2000_0000,
            Board::Pi2 => 0x3F00_0000,
            Board::Pi4 => 0xFE00_0000,
        }
    }

    /// Core clock feeding the SPI divider
    pub const fn core_clock_hz(self) -> u32 {
        match self {
            Board::Pi1 | Board::Pi2 => 250_000_000,
            Board::Pi4 => 500_000_000,
        }
    }

    pub const fn gpio_base(self) -> usize {
        self.peripheral_base() + GPIO_OFFSET
    }

    pub const fn sys_timer_base(self) -> usize {
        self.peripheral_base() + SYS_TIMER_OFFSET
    }

    pub const fn spi0_base(self) -> usize {
        self.peripheral_base() + SPI0_OFFSET
    }
}
