//! Heater-off-before-exit ordering under interrupts at any point of an
//! iteration

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rpi_temp_control::hal::{Gpio, PeripheralMapper, Region, BLOCK_SIZE};
use rpi_temp_control::{
    Actuator, ControlLoop, Heater, ShutdownHook, Target, TemperatureSample, Thermometer,
};
use tempfile::NamedTempFile;

const GPCLR0: usize = 10;

/// Heater level shared with the hook
#[derive(Clone, Default)]
struct Level(Arc<AtomicBool>);

impl Actuator for Level {
    fn set(&mut self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }
}

/// What the exit path saw
#[derive(Default)]
struct ExitRecord {
    calls: AtomicUsize,
    heater_was_on: AtomicBool,
}

/// Always cold; optionally fires the hook while sampling
struct Cold {
    hook: Option<Arc<ShutdownHook>>,
    fire_on: usize,
    taken: usize,
}

impl Thermometer for Cold {
    fn sample(&mut self) -> TemperatureSample {
        self.taken += 1;
        if self.taken == self.fire_on {
            if let Some(hook) = &self.hook {
                hook.fire();
            }
        }
        TemperatureSample::from_raw(200)
    }
}

fn recording_hook(level: &Level, record: &Arc<ExitRecord>) -> Arc<ShutdownHook> {
    let disarm = level.clone();
    let seen = Arc::clone(&level.0);
    let record = Arc::clone(record);
    Arc::new(ShutdownHook::new(
        move || disarm.0.store(false, Ordering::SeqCst),
        move |code| {
            assert_eq!(code, 0);
            record.calls.fetch_add(1, Ordering::SeqCst);
            record
                .heater_was_on
                .store(seen.load(Ordering::SeqCst), Ordering::SeqCst);
        },
    ))
}

#[test]
fn test_interrupt_while_sampling() {
    for trial in 0..50 {
        let level = Level::default();
        let record = Arc::new(ExitRecord::default());
        let fire_on = 2 + trial % 7;
        let thermometer = Cold {
            hook: Some(recording_hook(&level, &record)),
            fire_on,
            taken: 0,
        };
        let mut control = ControlLoop::new(thermometer, level.clone(), Target::new(50).unwrap());

        while record.calls.load(Ordering::SeqCst) == 0 {
            control.step();
            assert!(level.0.load(Ordering::SeqCst) || record.calls.load(Ordering::SeqCst) > 0);
        }

        assert_eq!(record.calls.load(Ordering::SeqCst), 1, "trial {}", trial);
        assert!(!record.heater_was_on.load(Ordering::SeqCst), "trial {}", trial);
    }
}

#[test]
fn test_interrupt_between_iterations() {
    for trial in 0..50 {
        let level = Level::default();
        let record = Arc::new(ExitRecord::default());
        let hook = recording_hook(&level, &record);
        let thermometer = Cold {
            hook: None,
            fire_on: 0,
            taken: 0,
        };
        let mut control = ControlLoop::new(thermometer, level.clone(), Target::new(50).unwrap());

        for _ in 0..=(trial % 5) {
            control.step();
        }
        assert!(level.0.load(Ordering::SeqCst), "heater on before interrupt");

        hook.fire();

        assert_eq!(record.calls.load(Ordering::SeqCst), 1);
        assert!(!record.heater_was_on.load(Ordering::SeqCst), "trial {}", trial);
    }
}

#[test]
fn test_switch_clears_heater_register_before_exit() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
    file.flush().unwrap();

    let gpio = Gpio::new(
        PeripheralMapper::with_device(file.path())
            .unwrap()
            .map(0, BLOCK_SIZE)
            .unwrap(),
    );
    // Second view of the same registers to observe the clear write
    let probe: Arc<Mutex<Region>> = Arc::new(Mutex::new(
        PeripheralMapper::with_device(file.path())
            .unwrap()
            .map(0, BLOCK_SIZE)
            .unwrap(),
    ));

    let mut heater = Heater::new(gpio, 17).unwrap();
    heater.set(true);
    probe.lock().unwrap().write(GPCLR0, 0);

    let switch = heater.switch();
    let cleared_at_exit = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&cleared_at_exit);
    let observer = Arc::clone(&probe);
    let hook = ShutdownHook::new(
        move || switch.off(),
        move |_| {
            let cleared = observer.lock().unwrap().read(GPCLR0) == 1 << 17;
            seen.store(cleared, Ordering::SeqCst);
        },
    );

    hook.fire();

    assert!(cleared_at_exit.load(Ordering::SeqCst));
}
