//! MCP3002 ADC reading an LM35 through a 3.2x amplifier
//!
//! The LM35 gives 10 mV/degC; after the gain stage the ADC sees
//! 32 mV/degC, so temperature = voltage * 31.25.
//!
//! # Protocol
//!
//! Two full-duplex bytes on SPI0 CE0:
//!
//! ```text
//! MOSI: 0 1 SGL ODD MSBF 0 0 0 | 0 0 0 0 0 0 0 0
//! MISO: x x  x   x   x   x B9 B8 | B7 ........ B0
//! ```

use crate::control::Thermometer;
use crate::hal::SpiBus;

/// Start bit
const START: u8 = 0x40;
/// Single-ended conversion
const SINGLE_ENDED: u8 = 0x20;
/// Selects CH1 in single-ended mode
const ODD: u8 = 0x10;
/// MSB-first output
const MSBF: u8 = 0x08;

/// Clocks out the low data byte
const PLACEHOLDER: u8 = 0x00;

/// ADC supply and reference voltage
pub const VREF: f64 = 5.0;
/// 10-bit full scale
pub const FULL_SCALE: f64 = 1024.0;
/// degC per volt at the ADC input (1 / (0.01 V * 3.2))
pub const DEGREES_PER_VOLT: f64 = 31.25;

/// ADC input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    #[default]
    Ch0,
    Ch1,
}

impl Channel {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Channel::Ch0),
            1 => Some(Channel::Ch1),
            _ => None,
        }
    }

    /// First byte of a single-ended conversion on this channel
    pub fn command(self) -> u8 {
        let odd = match self {
            Channel::Ch0 => 0,
            Channel::Ch1 => ODD,
        };
        START | SINGLE_ENDED | odd | MSBF
    }
}

/// One point reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSample {
    /// 10-bit conversion result
    pub raw: u16,
    /// Voltage at the ADC input
    pub voltage: f64,
    /// Temperature in degrees Celsius
    pub celsius: f64,
}

impl TemperatureSample {
    /// Convert a conversion result (masked to 10 bits)
    pub fn from_raw(raw: u16) -> Self {
        let raw = raw & 0x3FF;
        let voltage = f64::from(raw) * VREF / FULL_SCALE;
        Self {
            raw,
            voltage,
            celsius: voltage * DEGREES_PER_VOLT,
        }
    }

    /// Temperature truncated to whole degrees
    pub fn whole_degrees(&self) -> u32 {
        self.celsius as u32
    }
}

/// MCP3002 on an SPI bus
#[derive(Debug)]
pub struct Mcp3002<B> {
    bus: B,
    channel: Channel,
}

impl<B: SpiBus> Mcp3002<B> {
    pub fn new(bus: B, channel: Channel) -> Self {
        Self { bus, channel }
    }

    /// Run one conversion
    pub fn read(&mut self) -> TemperatureSample {
        let high = self.bus.exchange(self.channel.command());
        let low = self.bus.exchange(PLACEHOLDER);
        TemperatureSample::from_raw((u16::from(high & 0x03) << 8) | u16::from(low))
    }
}

impl<B: SpiBus> Thermometer for Mcp3002<B> {
    fn sample(&mut self) -> TemperatureSample {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Records what was sent and answers from a script
    struct ScriptedBus {
        sent: Vec<u8>,
        replies: VecDeque<u8>,
    }

    impl ScriptedBus {
        fn new(replies: &[u8]) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.iter().copied().collect(),
            }
        }
    }

    impl SpiBus for &mut ScriptedBus {
        fn exchange(&mut self, byte: u8) -> u8 {
            self.sent.push(byte);
            self.replies.pop_front().expect("unexpected exchange")
        }
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(Channel::Ch0.command(), 0x68);
        assert_eq!(Channel::Ch1.command(), 0x78);
    }

    #[test]
    fn test_read_protocol() {
        let mut bus = ScriptedBus::new(&[0xFE, 0x3B]);
        let sample = Mcp3002::new(&mut bus, Channel::Ch0).read();

        assert_eq!(bus.sent, vec![0x68, 0x00]);
        assert!(bus.replies.is_empty());
        // Only the low two bits of the first reply carry data
        assert_eq!(sample.raw, 0x23B);
    }

    #[test]
    fn test_conversion_matches_formula() {
        let mut previous = f64::NEG_INFINITY;
        for raw in 0..1024u16 {
            let sample = TemperatureSample::from_raw(raw);
            let expected = f64::from(raw) * 5.0 / 1024.0 * 31.25;
            assert_eq!(sample.celsius, expected, "raw {}", raw);
            assert!(sample.celsius > previous);
            previous = sample.celsius;
        }
    }

    #[test]
    fn test_conversion_endpoints() {
        assert_eq!(TemperatureSample::from_raw(0).celsius, 0.0);
        let top = TemperatureSample::from_raw(1023);
        assert_eq!(top.whole_degrees(), 156);
        assert_eq!(TemperatureSample::from_raw(0xFFFF).raw, 1023);
    }

    #[test]
    fn test_whole_degrees_truncate() {
        // 315 * 5 / 1024 * 31.25 = 48.06
        assert_eq!(TemperatureSample::from_raw(315).whole_degrees(), 48);
        // 327 -> 49.89
        assert_eq!(TemperatureSample::from_raw(327).whole_degrees(), 49);
    }
}
