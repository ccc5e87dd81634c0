//! Shutdown hook: heater off, then exit
//!
//! SIGINT/SIGTERM interrupt the control loop wherever it is. The handler
//! runs the installed [`ShutdownHook`] synchronously, which disarms the
//! heater through its GPIO clear register before terminating the process.
//! Nothing else runs between the two.

use std::io;

use once_cell::sync::OnceCell;

use crate::error::ShutdownError;
use crate::hal::Switch;

/// Exit status for an operator-requested stop
pub const EXIT_CLEAN: i32 = 0;

/// Signals that stop the controller
pub const SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

type Action = Box<dyn Fn() + Send + Sync>;
type Exit = Box<dyn Fn(i32) + Send + Sync>;

static HOOK: OnceCell<ShutdownHook> = OnceCell::new();

/// What to do when a stop is requested
pub struct ShutdownHook {
    disarm: Action,
    exit: Exit,
}

impl ShutdownHook {
    /// Hook running `disarm` and then `exit(EXIT_CLEAN)`
    pub fn new<D, E>(disarm: D, exit: E) -> Self
    where
        D: Fn() + Send + Sync + 'static,
        E: Fn(i32) + Send + Sync + 'static,
    {
        Self {
            disarm: Box::new(disarm),
            exit: Box::new(exit),
        }
    }

    /// Hook that drives `switch` low and `_exit`s
    pub fn for_switch(switch: Switch) -> Self {
        Self::new(
            move || switch.off(),
            // SAFETY: _exit is async-signal-safe and does not return.
            |code| unsafe { libc::_exit(code) },
        )
    }

    /// Disarm, then exit
    pub fn fire(&self) {
        (self.disarm)();
        (self.exit)(EXIT_CLEAN);
    }

    /// Make this the process-wide hook and route [`SIGNALS`] to it
    pub fn install(self) -> Result<&'static ShutdownHook, ShutdownError> {
        HOOK.set(self).map_err(|_| ShutdownError::AlreadyInstalled)?;
        let hook = HOOK.get().ok_or(ShutdownError::AlreadyInstalled)?;

        for signal in SIGNALS {
            // SAFETY: the handler only reads the initialized cell and
            // calls the hook, which does volatile writes and _exit.
            unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction =
                    on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
                libc::sigemptyset(&mut action.sa_mask);
                for blocked in SIGNALS {
                    libc::sigaddset(&mut action.sa_mask, blocked);
                }
                if libc::sigaction(signal, &action, std::ptr::null_mut()) != 0 {
                    return Err(ShutdownError::Register {
                        signal,
                        source: io::Error::last_os_error(),
                    });
                }
            }
        }

        log::debug!("shutdown hook installed for SIGINT, SIGTERM");
        Ok(hook)
    }
}

impl std::fmt::Debug for ShutdownHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHook").finish_non_exhaustive()
    }
}

extern "C" fn on_signal(_: libc::c_int) {
    if let Some(hook) = HOOK.get() {
        hook.fire();
    }
}
