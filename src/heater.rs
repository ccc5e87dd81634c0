//! Heater output on a GPIO pin

use crate::control::Actuator;
use crate::error::{HalError, HalResult};
use crate::hal::gpio::MAX_PIN;
use crate::hal::{Function, Gpio, Switch};

/// Heater driven high-on through a GPIO output
///
/// The pin is driven low when the heater is dropped, so unwinding out of
/// the control loop leaves the element off.
#[derive(Debug)]
pub struct Heater {
    gpio: Gpio,
    pin: u8,
}

impl Heater {
    /// Make `pin` an output and start with the heater off
    pub fn new(mut gpio: Gpio, pin: u8) -> HalResult<Self> {
        if pin > MAX_PIN {
            return Err(HalError::InvalidPin(pin));
        }
        gpio.set_mode(pin, Function::Output);
        gpio.write(pin, false);
        log::debug!("heater on GPIO{}", pin);
        Ok(Self { gpio, pin })
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Pin level as reported by the hardware
    pub fn is_on(&self) -> bool {
        self.gpio.read(self.pin)
    }

    /// Handle that can force the heater off from a signal handler
    pub fn switch(&self) -> Switch {
        self.gpio
            .switch(self.pin)
            .unwrap_or_else(|| unreachable!("pin checked in Heater::new"))
    }

    pub fn off(&mut self) {
        self.gpio.write(self.pin, false);
    }
}

impl Actuator for Heater {
    fn set(&mut self, on: bool) {
        self.gpio.write(self.pin, on);
    }
}

impl Drop for Heater {
    fn drop(&mut self) {
        self.off();
    }
}
