//! Stand-ins for the probe, its power rail and the chip power controls.

use std::convert::Infallible;
use std::time::Duration as StdDuration;

use embassy_time::Duration;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info};

use soil_core::power::PowerPlatform;
use soil_core::sensors::AnalogInput;

/// Probe that reads around a fixed raw value with a small deterministic wobble
pub struct SimulatedProbe {
    base: u16,
    jitter: u16,
    reads: u32,
}

impl SimulatedProbe {
    pub fn new(base: u16, jitter: u16) -> Self {
        Self {
            base,
            jitter,
            reads: 0,
        }
    }
}

impl AnalogInput for SimulatedProbe {
    fn read_raw(&mut self) -> u16 {
        self.reads += 1;
        if self.jitter == 0 {
            return self.base;
        }
        // Triangle wave in -jitter..=jitter
        let span = 2 * self.jitter as i32;
        let phase = (self.reads as i32 * 7) % (2 * span);
        let offset = if phase < span { phase } else { 2 * span - phase } - self.jitter as i32;
        (self.base as i32 + offset).clamp(0, 1023) as u16
    }
}

/// Probe power rail, only logs transitions
#[derive(Default)]
pub struct SimulatedRail {
    pub high: bool,
}

impl ErrorType for SimulatedRail {
    type Error = Infallible;
}

impl OutputPin for SimulatedRail {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        debug!("Probe power off");
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        debug!("Probe power on");
        self.high = true;
        Ok(())
    }
}

pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(StdDuration::from_nanos(ns as u64));
    }
}

/// Records the power-down instead of halting the process
pub struct SimulatedPower {
    pub radio_on: bool,
    pub slept_for: Option<Duration>,
}

impl SimulatedPower {
    pub fn new() -> Self {
        Self {
            radio_on: true,
            slept_for: None,
        }
    }
}

impl PowerPlatform for SimulatedPower {
    fn radio_off(&mut self) {
        info!("Radio off");
        self.radio_on = false;
    }

    fn halt(&mut self, duration: Duration) {
        info!("Halting for {} s (simulated)", duration.as_secs());
        self.slept_for = Some(duration);
    }
}
