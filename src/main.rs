//! temp-control
//!
//! Holds a resistive heater at a target temperature between 30 and 70 °C.
//!
//! # Usage
//!
//! ```bash
//! # Hold 50 °C with the default Pi 2 wiring (requires root for /dev/mem)
//! sudo temp-control 50
//!
//! # Pi 4, heater on GPIO22, one sample every 100 ms
//! sudo temp-control --board pi4 --heater-pin 22 --interval-ms 100 50
//!
//! # Settings from a file, flags still override
//! sudo temp-control -c /etc/temp-control.toml 45
//! ```
//!
//! Ctrl+C (or SIGTERM) turns the heater off and exits with status 0.

use std::convert::Infallible;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;

use rpi_temp_control::hal::{
    Board, Gpio, PeripheralMapper, Spi, SpiConfig, SystemTimer, BLOCK_SIZE,
};
use rpi_temp_control::{ControlLoop, Heater, Mcp3002, Report, Settings, ShutdownHook, Target};

/// Wrong argument count or unusable settings
const EXIT_USAGE: u8 = 1;
/// Target not an integer in range
const EXIT_TARGET: u8 = 2;
/// Register access failed
const EXIT_FATAL: u8 = 255;

/// Bang-bang heater controller
///
/// Reads an LM35 through an MCP3002 on SPI0 and switches the heater GPIO
/// to hold the target temperature.
#[derive(Parser)]
#[command(name = "temp-control")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Bang-bang heater controller for Raspberry Pi")]
struct Cli {
    /// Target temperature in °C (30-70)
    #[arg(allow_hyphen_values = true)]
    target: String,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board (sets peripheral base address and SPI core clock)
    #[arg(long, value_enum)]
    board: Option<Board>,

    /// GPIO driving the heater
    #[arg(long)]
    heater_pin: Option<u8>,

    /// Requested SPI clock in Hz
    #[arg(long)]
    spi_hz: Option<u32>,

    /// Delay between samples in milliseconds
    #[arg(long)]
    interval_ms: Option<u32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(board) = self.board {
            settings.board = board;
        }
        if let Some(pin) = self.heater_pin {
            settings.heater_pin = pin;
        }
        if let Some(hz) = self.spi_hz {
            settings.spi_frequency_hz = hz;
        }
        if let Some(ms) = self.interval_ms {
            settings.interval_ms = ms;
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    // Initialize logger
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let target = match Target::parse(&cli.target) {
        Ok(target) => target,
        Err(e) => {
            log::error!("{}", e);
            eprintln!(
                "Invalid temperature parameter. Please choose a temperature between {} and {}",
                Target::MIN,
                Target::MAX
            );
            return ExitCode::from(EXIT_TARGET);
        }
    };

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    match run(target, &settings) {
        Ok(never) => match never {},
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Map the peripherals, arm the shutdown hook and regulate until signalled
fn run(target: Target, settings: &Settings) -> Result<Infallible> {
    let board = settings.board;

    let mut mapper = PeripheralMapper::open().context("register access requires root")?;
    let mut gpio = Gpio::new(
        mapper
            .map(board.gpio_base(), BLOCK_SIZE)
            .context("GPIO block")?,
    );
    let spi_regs = mapper
        .map(board.spi0_base(), BLOCK_SIZE)
        .context("SPI0 block")?;
    let mut timer = SystemTimer::new(
        mapper
            .map(board.sys_timer_base(), BLOCK_SIZE)
            .context("system timer block")?,
    );

    let spi_config = SpiConfig::new(
        board.core_clock_hz(),
        settings.spi_frequency_hz,
        settings.spi_mode().flags(),
    )?;
    let spi = Spi::init(spi_regs, &mut gpio, &spi_config);

    let heater = Heater::new(gpio, settings.heater_pin)?;
    ShutdownHook::for_switch(heater.switch())
        .install()
        .context("installing shutdown hook")?;

    log::info!(
        "holding {} °C on {:?}, heater GPIO{}, ADC {:?}",
        target,
        board,
        heater.pin(),
        settings.adc_channel()
    );

    let sensor = Mcp3002::new(spi, settings.adc_channel());
    let mut control = ControlLoop::new(sensor, heater, target);
    let interval_ms = settings.interval_ms;

    control.run(|step| {
        if let Some(report) = step.report {
            print_report(&report);
        }
        log::trace!("{:.2} °C raw {} {:?}", step.sample.celsius, step.sample.raw, step.mode);
        timer.sleep_millis(interval_ms);
    })
}

fn print_report(report: &Report) {
    println!("current temp: {}", report.temperature.to_string().cyan());
    if let Some(overshoot) = report.overshoot {
        println!("overshoot: {}", overshoot.to_string().yellow());
    }
}
