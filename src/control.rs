//! Bang-bang temperature control
//!
//! Two states and no hysteresis band: the heater is on exactly while the
//! truncated reading is below the target, and is re-commanded on every
//! iteration whether or not the state changed.

use std::fmt;

use crate::error::ConfigError;
use crate::sensor::TemperatureSample;

/// Source of temperature samples
pub trait Thermometer {
    fn sample(&mut self) -> TemperatureSample;
}

/// Binary heater output
pub trait Actuator {
    fn set(&mut self, on: bool);
}

/// Operator setpoint in whole degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target(u32);

impl Target {
    pub const MIN: u32 = 30;
    pub const MAX: u32 = 70;

    pub fn new(celsius: i64) -> Result<Self, ConfigError> {
        if celsius < i64::from(Self::MIN) || celsius > i64::from(Self::MAX) {
            return Err(ConfigError::TargetOutOfRange {
                value: celsius,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(celsius as u32))
    }

    /// Parse a decimal command-line argument
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        let value = arg
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidTarget(arg.to_string()))?;
        Self::new(value)
    }

    pub fn celsius(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Below target, heater on
    Heating,
    /// At or above target, heater off
    Idle,
}

impl Mode {
    pub fn heater_on(self) -> bool {
        self == Mode::Heating
    }
}

/// Values carried between iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    target: Target,
    last_reported: u32,
    max_observed: u32,
    mode: Mode,
}

impl ControlState {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            last_reported: 0,
            max_observed: 0,
            mode: Mode::Idle,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn last_reported(&self) -> u32 {
        self.last_reported
    }

    /// Highest whole-degree reading seen so far
    pub fn max_observed(&self) -> u32 {
        self.max_observed
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Highest reading minus target; negative until the target is reached
    pub fn overshoot(&self) -> i64 {
        i64::from(self.max_observed) - i64::from(self.target.celsius())
    }
}

/// Console report emitted when the whole-degree reading changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub temperature: u32,
    /// Present when the reading is at or above target. Computed from the
    /// maximum seen *before* this reading.
    pub overshoot: Option<i64>,
}

/// Outcome of one iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub sample: TemperatureSample,
    pub temperature: u32,
    pub mode: Mode,
    pub report: Option<Report>,
}

/// Sensor, heater and state driven one sample at a time
#[derive(Debug)]
pub struct ControlLoop<T, A> {
    thermometer: T,
    actuator: A,
    state: ControlState,
}

impl<T: Thermometer, A: Actuator> ControlLoop<T, A> {
    pub fn new(thermometer: T, actuator: A, target: Target) -> Self {
        Self {
            thermometer,
            actuator,
            state: ControlState::new(target),
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Sample once, report if changed, drive the heater, track the maximum
    pub fn step(&mut self) -> Step {
        let sample = self.thermometer.sample();
        let temperature = sample.whole_degrees();
        let target = self.state.target.celsius();

        let mut report = None;
        if temperature != self.state.last_reported {
            self.state.last_reported = temperature;
            let overshoot = if temperature >= target {
                Some(self.state.overshoot())
            } else {
                None
            };
            report = Some(Report {
                temperature,
                overshoot,
            });
        }

        let mode = if temperature < target {
            Mode::Heating
        } else {
            Mode::Idle
        };
        self.actuator.set(mode.heater_on());
        self.state.mode = mode;

        self.state.max_observed = self.state.max_observed.max(temperature);

        Step {
            sample,
            temperature,
            mode,
            report,
        }
    }

    /// Run forever, handing each iteration to `observe`
    ///
    /// Only a signal (see [`crate::shutdown`]) ends the loop.
    pub fn run<F: FnMut(&Step)>(&mut self, mut observe: F) -> ! {
        loop {
            let step = self.step();
            observe(&step);
        }
    }
}
