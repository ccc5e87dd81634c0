//! BCM283x GPIO driver
//!
//! Pin function select, output set/clear and level read for pins 0-53.
//!
//! # Pin Assignments
//!
//! | GPIO  | Function           | Mode   |
//! |-------|--------------------|--------|
//! | 8     | SPI0 CE0 (ADC)     | ALT0   |
//! | 9     | SPI0 MISO          | ALT0   |
//! | 10    | SPI0 MOSI          | ALT0   |
//! | 11    | SPI0 SCLK          | ALT0   |
//! | 17    | Heater (default)   | Output |

use std::ptr::NonNull;

use super::mapper::Region;

/// Highest GPIO number on the header and internal banks
pub const MAX_PIN: u8 = 53;

/// GPIO register word indices
mod regs {
    pub const GPFSEL0: usize = 0; // Function Select 0-5 (10 pins each)
    pub const GPSET0: usize = 7; // Pin Output Set 0 (pins 0-31)
    pub const GPSET1: usize = 8; // Pin Output Set 1 (pins 32-53)
    pub const GPCLR0: usize = 10; // Pin Output Clear 0
    pub const GPCLR1: usize = 11; // Pin Output Clear 1
    pub const GPLEV0: usize = 13; // Pin Level 0
    pub const GPLEV1: usize = 14; // Pin Level 1
}

/// Pin function (GPFSEL encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl Function {
    /// Decode a 3-bit GPFSEL field
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0b000 => Function::Input,
            0b001 => Function::Output,
            0b100 => Function::Alt0,
            0b101 => Function::Alt1,
            0b110 => Function::Alt2,
            0b111 => Function::Alt3,
            0b011 => Function::Alt4,
            0b010 => Function::Alt5,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

fn pin_in_range(pin: u8) -> bool {
    if pin > MAX_PIN {
        log::warn!("bad pin, got pin {}", pin);
        return false;
    }
    true
}

/// Set and clear register indices plus bit mask for `pin`
fn output_regs(pin: u8) -> (usize, usize, u32) {
    let mask = 1u32 << (pin % 32);
    if pin < 32 {
        (regs::GPSET0, regs::GPCLR0, mask)
    } else {
        (regs::GPSET1, regs::GPCLR1, mask)
    }
}

/// GPIO driver over a mapped GPIO block
///
/// Holds no pin state of its own; every call goes to the registers.
#[derive(Debug)]
pub struct Gpio {
    regs: Region,
}

impl Gpio {
    /// Wrap the mapped GPIO block
    pub fn new(regs: Region) -> Self {
        Self { regs }
    }

    /// Set the raw 3-bit function code of `pin`
    ///
    /// Out-of-range pins or codes are logged and ignored.
    pub fn set_function(&mut self, pin: u8, code: u8) {
        if !pin_in_range(pin) {
            return;
        }
        if code > 7 {
            log::warn!("bad function, got function {}", code);
            return;
        }

        let word = regs::GPFSEL0 + usize::from(pin / 10);
        let shift = u32::from(pin % 10) * 3;
        self.regs
            .modify(word, |v| (v & !(0b111 << shift)) | (u32::from(code) << shift));
    }

    /// Configure a pin's function
    pub fn set_mode(&mut self, pin: u8, function: Function) {
        self.set_function(pin, function.code());
    }

    /// Current function of `pin`, read back from GPFSEL
    pub fn mode(&self, pin: u8) -> Option<Function> {
        if !pin_in_range(pin) {
            return None;
        }
        let word = regs::GPFSEL0 + usize::from(pin / 10);
        let shift = u32::from(pin % 10) * 3;
        Function::from_code(((self.regs.read(word) >> shift) & 0b111) as u8)
    }

    /// Drive `pin` high or low
    pub fn write(&mut self, pin: u8, level: bool) {
        if !pin_in_range(pin) {
            return;
        }
        let (set, clear, mask) = output_regs(pin);
        self.regs.write(if level { set } else { clear }, mask);
    }

    /// Read the level of `pin`; out-of-range pins read low
    pub fn read(&self, pin: u8) -> bool {
        if !pin_in_range(pin) {
            return false;
        }
        let word = if pin < 32 { regs::GPLEV0 } else { regs::GPLEV1 };
        (self.regs.read(word) >> (pin % 32)) & 1 == 1
    }

    /// Detached output handle for `pin`, usable from a signal handler
    pub fn switch(&self, pin: u8) -> Option<Switch> {
        if !pin_in_range(pin) {
            return None;
        }
        let (set, clear, mask) = output_regs(pin);
        Some(Switch {
            set: self.regs.word_ptr(set),
            clear: self.regs.word_ptr(clear),
            mask,
        })
    }

    #[cfg(test)]
    pub(crate) fn regs_mut(&mut self) -> &mut Region {
        &mut self.regs
    }
}

/// A pin's set/clear registers, detached from the owning [`Gpio`]
///
/// Writes to GPSET/GPCLR only affect the bits written, so a `Switch` can
/// drive its pin concurrently with the owning driver.
#[derive(Debug, Clone, Copy)]
pub struct Switch {
    set: NonNull<u32>,
    clear: NonNull<u32>,
    mask: u32,
}

// Register windows are never unmapped, so the pointers stay valid for the
// process lifetime.
unsafe impl Send for Switch {}
unsafe impl Sync for Switch {}

impl Switch {
    /// Drive the pin high
    pub fn on(&self) {
        // SAFETY: points into a live register window (see above).
        unsafe { self.set.as_ptr().write_volatile(self.mask) }
    }

    /// Drive the pin low
    pub fn off(&self) {
        // SAFETY: points into a live register window (see above).
        unsafe { self.clear.as_ptr().write_volatile(self.mask) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::BLOCK_SIZE;
    use rand_core::{RngCore, SeedableRng};
    use rand_pcg::Pcg32;

    fn gpio() -> Gpio {
        Gpio::new(Region::anonymous(BLOCK_SIZE).unwrap())
    }

    #[test]
    fn test_function_codes_round_trip() {
        for code in 0..8 {
            assert_eq!(Function::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Function::from_code(8), None);
        assert_eq!(Function::Alt0.code(), 4);
        assert_eq!(Function::Alt5.code(), 2);
    }

    #[test]
    fn test_set_function_preserves_neighbours() {
        let mut rng = Pcg32::seed_from_u64(0x5EED);
        let mut gpio = gpio();

        for pin in 0..=MAX_PIN {
            for code in 0..8u8 {
                let word = usize::from(pin / 10);
                let shift = u32::from(pin % 10) * 3;
                let before = rng.next_u32();
                gpio.regs_mut().write(word, before);

                gpio.set_function(pin, code);

                let after = gpio.regs_mut().read(word);
                let field = 0b111u32 << shift;
                assert_eq!(after & !field, before & !field, "pin {} code {}", pin, code);
                assert_eq!((after & field) >> shift, u32::from(code));
            }
        }
    }

    #[test]
    fn test_rejected_inputs_leave_registers() {
        let mut gpio = gpio();
        for word in 0..6 {
            gpio.regs_mut().write(word, 0x1234_5678);
        }

        gpio.set_function(54, 1);
        gpio.set_function(17, 8);
        gpio.write(60, true);

        for word in 0..16 {
            let expected = if word < 6 { 0x1234_5678 } else { 0 };
            assert_eq!(gpio.regs_mut().read(word), expected);
        }
        assert!(!gpio.read(54));
        assert!(gpio.switch(54).is_none());
    }

    #[test]
    fn test_mode_read_back() {
        let mut gpio = gpio();
        gpio.set_mode(17, Function::Output);
        gpio.set_mode(8, Function::Alt0);
        assert_eq!(gpio.mode(17), Some(Function::Output));
        assert_eq!(gpio.mode(8), Some(Function::Alt0));
        assert_eq!(gpio.mode(9), Some(Function::Input));
    }

    #[test]
    fn test_write_selects_bank() {
        let mut gpio = gpio();

        gpio.write(17, true);
        assert_eq!(gpio.regs_mut().read(regs::GPSET0), 1 << 17);

        gpio.write(17, false);
        assert_eq!(gpio.regs_mut().read(regs::GPCLR0), 1 << 17);

        gpio.write(40, true);
        assert_eq!(gpio.regs_mut().read(regs::GPSET1), 1 << 8);

        gpio.write(53, false);
        assert_eq!(gpio.regs_mut().read(regs::GPCLR1), 1 << 21);
    }

    #[test]
    fn test_read_selects_bank() {
        let mut gpio = gpio();
        gpio.regs_mut().write(regs::GPLEV0, 1 << 4);
        gpio.regs_mut().write(regs::GPLEV1, 1 << 3);

        assert!(gpio.read(4));
        assert!(!gpio.read(5));
        assert!(gpio.read(35));
        assert!(!gpio.read(3));
    }

    #[test]
    fn test_switch_writes_same_registers() {
        let mut gpio = gpio();
        let switch = gpio.switch(22).unwrap();

        switch.on();
        assert_eq!(gpio.regs_mut().read(regs::GPSET0), 1 << 22);
        switch.off();
        assert_eq!(gpio.regs_mut().read(regs::GPCLR0), 1 << 22);
    }
}
