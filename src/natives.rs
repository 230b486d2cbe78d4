//! Fixed registry of host functions visible to every program.

use std::rc::Rc;
use std::time::{Instant, SystemTime, SystemTimeError, UNIX_EPOCH};

use log::debug;

use crate::environment::Environment;
use crate::value::{Callable, NativeFunction, Value};

/// Time source behind `clock()`.
pub trait Clock {
    /// Fractional seconds since an arbitrary, fixed epoch.
    fn now(&self) -> Result<f64, String>;
}

/// Monotonic clock whose epoch is the moment it was created.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<f64, String> {
        Ok(self.origin.elapsed().as_secs_f64())
    }
}

/// Wall clock, seconds since the UNIX epoch.  Not monotonic.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<f64, String> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .map_err(|e: SystemTimeError| format!("Clock error: {}", e))
    }
}

/// Install every native function into `globals`.
pub fn define_natives(globals: &mut Environment, clock: Rc<dyn Clock>) {
    debug!("Defining native function 'clock'");

    globals.define(
        "clock",
        native("clock", 0, move |_args| {
            let seconds = clock.now()?;
            Ok(Value::Number(seconds))
        }),
    );
}

fn native(
    name: &'static str,
    arity: usize,
    func: impl Fn(&[Value]) -> Result<Value, String> + 'static,
) -> Value {
    Value::Callable(Callable::Native(Rc::new(NativeFunction {
        name,
        arity,
        func: Box::new(func),
    })))
}
