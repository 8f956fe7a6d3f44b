//! Monotonic time source for deadline checks
//!
//! The controller never sleeps while waiting; it compares deadlines against
//! this clock on every tick. Firmware and simulator read `Instant::now()`,
//! tests drive a [`ManualClock`] by hand.

use core::cell::Cell;

use embassy_time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy time driver
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: Cell<u64>,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            millis: Cell::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.set(self.millis.get() + by.as_millis());
    }

    pub fn set_millis(&self, millis: u64) {
        self.millis.set(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.millis.get())
    }
}
