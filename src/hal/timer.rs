//! BCM283x system timer
//!
//! A 64-bit counter ticking at 1 MHz, plus four 32-bit compare channels.
//! Channels 0 and 2 belong to the GPU; delays here use channel 1.

use std::hint;

use super::mapper::Region;

/// System timer register word indices
mod regs {
    pub const CS: usize = 0; // Control/Status (match flags M0-M3, write 1 to clear)
    pub const CLO: usize = 1; // Counter lower 32 bits
    pub const CHI: usize = 2; // Counter higher 32 bits
    #[cfg(test)]
    pub const C0: usize = 3; // Compare 0
    pub const C1: usize = 4; // Compare 1
    #[cfg(test)]
    pub const C3: usize = 6; // Compare 3
}

/// Match flag for compare channel 1
const M1: u32 = 1 << 1;

/// System timer driver
#[derive(Debug)]
pub struct SystemTimer {
    regs: Region,
}

impl SystemTimer {
    pub fn new(regs: Region) -> Self {
        Self { regs }
    }

    /// Lower word of the free-running counter (microseconds, wraps ~71 min)
    pub fn counter_low(&self) -> u32 {
        self.regs.read(regs::CLO)
    }

    /// Full 64-bit counter in microseconds
    pub fn counter(&self) -> u64 {
        loop {
            let hi = self.regs.read(regs::CHI);
            let lo = self.regs.read(regs::CLO);
            if self.regs.read(regs::CHI) == hi {
                return (u64::from(hi) << 32) | u64::from(lo);
            }
        }
    }

    /// Block for at least `micros` microseconds
    ///
    /// Spins on the channel 1 match flag; never yields the CPU.
    pub fn sleep_micros(&mut self, micros: u32) {
        if micros == 0 {
            return;
        }
        let target = self.counter_low().wrapping_add(micros);
        self.regs.write(regs::C1, target);
        self.regs.write(regs::CS, M1);
        while self.regs.read(regs::CS) & M1 == 0 {
            hint::spin_loop();
        }
    }

    /// Block for at least `millis` milliseconds
    pub fn sleep_millis(&mut self, millis: u32) {
        self.sleep_micros(millis.saturating_mul(1000));
    }
}
