//! Bang-bang heater controller for Raspberry Pi
//!
//! Holds a resistive heater at a setpoint by reading an LM35 through an
//! MCP3002 ADC on SPI0 and switching a GPIO output.
//!
//! # Architecture
//!
//! ```text
//!            ControlLoop ◄──── ShutdownHook (SIGINT/SIGTERM)
//!            │         │              │
//!            ▼         ▼              │
//!     ┌──────────┐ ┌────────┐         │
//!     │ Mcp3002  │ │ Heater │◄────────┘ Switch
//!     └────┬─────┘ └───┬────┘
//!          ▼           │
//!     ┌──────────┐     │
//!     │   Spi    │     │
//!     └────┬─────┘     ▼
//!          └──────► ┌──────┐   ┌─────────────┐
//!                   │ Gpio │   │ SystemTimer │
//!                   └──┬───┘   └──────┬──────┘
//!                      ▼              ▼
//!                PeripheralMapper (/dev/mem)
//! ```
//!
//! Registers are reached only through [`hal::Region`]; drivers own their
//! regions and expose named operations.

pub mod config;
pub mod control;
pub mod error;
pub mod hal;
pub mod heater;
pub mod sensor;
pub mod shutdown;

pub use config::Settings;
pub use control::{Actuator, ControlLoop, ControlState, Mode, Report, Step, Target, Thermometer};
pub use error::{ConfigError, HalError, ShutdownError};
pub use heater::Heater;
pub use sensor::{Channel, Mcp3002, TemperatureSample};
pub use shutdown::ShutdownHook;
