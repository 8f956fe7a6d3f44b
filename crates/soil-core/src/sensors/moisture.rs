use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use super::{AnalogInput, NormalizedReading, Reading, Sampler, SensorError, normalize, validate};
use crate::config::SensorConfig;

/// Capacitive soil probe behind a switched power rail.
///
/// The rail is only up for the duration of [`MoistureSampler::acquire`], so
/// the probe draws nothing while the node waits for the bridge.
pub struct MoistureSampler<P, A, D> {
    power: P,
    input: A,
    delay: D,
    config: SensorConfig,
}

impl<P, A, D> MoistureSampler<P, A, D>
where
    P: OutputPin,
    A: AnalogInput,
    D: DelayNs,
{
    pub fn new(power: P, input: A, delay: D, config: SensorConfig) -> Self {
        Self {
            power,
            input,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Power the probe, take the configured number of raw readings, power it off
    pub fn acquire(&mut self) -> Result<Reading, SensorError> {
        validate(&self.config)?;

        if self.power.set_high().is_err() {
            // Leave the rail in a known state even if the switch is unhappy
            let _ = self.power.set_low();
            return Err(SensorError::PowerRail { state: "on" });
        }
        if self.config.settle_ms > 0 {
            self.delay.delay_ms(self.config.settle_ms);
        }

        let mut reading = Reading::default();
        for i in 0..self.config.measurements {
            let raw = self.input.read_raw();
            debug!("Moisture sample {}: {}", i, raw);
            // capacity was checked by validate()
            let _ = reading.raw_samples.push(raw);
        }

        self.power
            .set_low()
            .map_err(|_| SensorError::PowerRail { state: "off" })?;

        Ok(reading)
    }

    /// Release the hardware handles
    pub fn into_inner(self) -> (P, A, D) {
        (self.power, self.input, self.delay)
    }
}

impl<P, A, D> Sampler for MoistureSampler<P, A, D>
where
    P: OutputPin,
    A: AnalogInput,
    D: DelayNs,
{
    fn sample(&mut self) -> Result<NormalizedReading, SensorError> {
        let reading = self.acquire()?;
        let percent = normalize(&reading, &self.config)?;

        if !(0..=100).contains(&percent.value()) {
            warn!(
                "Moisture {}% is outside the calibrated span ({}..{})",
                percent.value(),
                self.config.raw_min,
                self.config.raw_max
            );
        }
        info!("Moisture: {}%", percent.value());

        Ok(percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        PowerOn,
        PowerOff,
        Read(u16),
        Delay(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct FakeRail(Log);

    impl embedded_hal::digital::ErrorType for FakeRail {
        type Error = Infallible;
    }

    impl OutputPin for FakeRail {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(Event::PowerOff);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(Event::PowerOn);
            Ok(())
        }
    }

    struct FakeAdc {
        log: Log,
        values: Vec<u16>,
        next: usize,
    }

    impl AnalogInput for FakeAdc {
        fn read_raw(&mut self) -> u16 {
            let value = self.values[self.next % self.values.len()];
            self.next += 1;
            self.log.borrow_mut().push(Event::Read(value));
            value
        }
    }

    struct FakeDelay(Log);

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Event::Delay(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Event::Delay(ms));
        }
    }

    fn sampler(
        values: &[u16],
        config: SensorConfig,
    ) -> (MoistureSampler<FakeRail, FakeAdc, FakeDelay>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let adc = FakeAdc {
            log: log.clone(),
            values: values.to_vec(),
            next: 0,
        };
        let sampler = MoistureSampler::new(FakeRail(log.clone()), adc, FakeDelay(log.clone()), config);
        (sampler, log)
    }

    #[test]
    fn test_rail_brackets_every_read() {
        let (mut sampler, log) = sampler(&[400, 410, 420], SensorConfig::DEFAULT);

        sampler.sample().unwrap();

        let events = log.borrow();
        assert_eq!(events.first(), Some(&Event::PowerOn));
        assert_eq!(events.last(), Some(&Event::PowerOff));
        let reads = events.iter().filter(|e| matches!(e, Event::Read(_))).count();
        assert_eq!(reads, 5, "one read per configured measurement");
    }

    #[test]
    fn test_dry_probe_publishes_full_scale() {
        let (mut sampler, _) = sampler(&[265], SensorConfig::DEFAULT);
        assert_eq!(sampler.sample().unwrap(), NormalizedReading(100));
    }

    #[test]
    fn test_wet_probe_publishes_zero() {
        let (mut sampler, _) = sampler(&[830], SensorConfig::DEFAULT);
        assert_eq!(sampler.sample().unwrap(), NormalizedReading(0));
    }

    #[test]
    fn test_settle_delay_runs_after_power_on() {
        let config = SensorConfig {
            settle_ms: 20,
            measurements: 1,
            ..SensorConfig::DEFAULT
        };
        let (mut sampler, log) = sampler(&[500], config);

        sampler.acquire().unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            &[Event::PowerOn, Event::Delay(20), Event::Read(500), Event::PowerOff]
        );
    }

    #[test]
    fn test_invalid_config_never_touches_rail() {
        let config = SensorConfig {
            measurements: 0,
            ..SensorConfig::DEFAULT
        };
        let (mut sampler, log) = sampler(&[500], config);

        assert!(sampler.sample().is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_acquire_keeps_sample_order() {
        let config = SensorConfig {
            measurements: 3,
            ..SensorConfig::DEFAULT
        };
        let (mut sampler, _) = sampler(&[300, 310, 320], config);

        let reading = sampler.acquire().unwrap();

        assert_eq!(reading.raw_samples.as_slice(), &[300, 310, 320]);
    }
}
