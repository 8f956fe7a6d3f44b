//! Sensor sampling and normalization
//!
//! A measurement is a burst of raw ADC readings taken while the probe's power
//! rail is up. The burst is averaged and remapped against the calibration
//! bounds into a percentage.

mod moisture;

pub use moisture::MoistureSampler;

use heapless::Vec;
use thiserror_no_std::Error;

use crate::config::{MAX_MEASUREMENTS, SensorConfig};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("Invalid calibration: {details}")]
    InvalidCalibration { details: &'static str },
    #[error("Sensor power rail could not be switched {state}")]
    PowerRail { state: &'static str },
}

/// Opaque analog read primitive.
///
/// The hardware gives no signal for a bad conversion, so a read always
/// produces a value.
pub trait AnalogInput {
    fn read_raw(&mut self) -> u16;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    fn read_raw(&mut self) -> u16 {
        (**self).read_raw()
    }
}

/// Anything that can produce a normalized reading on demand
pub trait Sampler {
    fn sample(&mut self) -> Result<NormalizedReading, SensorError>;
}

impl<T: Sampler + ?Sized> Sampler for &mut T {
    fn sample(&mut self) -> Result<NormalizedReading, SensorError> {
        (**self).sample()
    }
}

/// Raw samples of a single measurement
#[derive(Debug, Clone, Default)]
pub struct Reading {
    pub raw_samples: Vec<u16, MAX_MEASUREMENTS>,
}

impl Reading {
    pub fn from_samples(samples: &[u16]) -> Result<Self, SensorError> {
        let raw_samples = Vec::from_slice(samples).map_err(|_| SensorError::InvalidCalibration {
            details: "more samples than a measurement can hold",
        })?;
        Ok(Self { raw_samples })
    }

    /// Arithmetic mean, accumulated in floating point
    pub fn mean(&self) -> Option<f64> {
        if self.raw_samples.is_empty() {
            return None;
        }
        let sum: f64 = self.raw_samples.iter().map(|&v| v as f64).sum();
        Some(sum / self.raw_samples.len() as f64)
    }
}

/// Moisture as a percentage of the calibrated span.
///
/// Usually within 0..=100, but raw values past the calibration bounds map
/// outside that range unless clamping is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NormalizedReading(pub i32);

impl NormalizedReading {
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// Integer linear remap, truncating toward zero
pub const fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Check that a sensor configuration can produce a reading at all
pub fn validate(config: &SensorConfig) -> Result<(), SensorError> {
    if config.measurements == 0 {
        return Err(SensorError::InvalidCalibration {
            details: "measurement count must be at least one",
        });
    }
    if config.measurements > MAX_MEASUREMENTS {
        return Err(SensorError::InvalidCalibration {
            details: "measurement count exceeds MAX_MEASUREMENTS",
        });
    }
    if config.raw_min == config.raw_max {
        return Err(SensorError::InvalidCalibration {
            details: "raw_min and raw_max must differ",
        });
    }
    Ok(())
}

/// Average a reading and remap it against the calibration bounds
pub fn normalize(reading: &Reading, config: &SensorConfig) -> Result<NormalizedReading, SensorError> {
    if config.raw_min == config.raw_max {
        return Err(SensorError::InvalidCalibration {
            details: "raw_min and raw_max must differ",
        });
    }
    let mean = reading.mean().ok_or(SensorError::InvalidCalibration {
        details: "no samples to average",
    })?;

    let (out_min, out_max) = config.polarity.output_range();
    let mut percent = map_range(
        mean as i64,
        config.raw_min as i64,
        config.raw_max as i64,
        out_min as i64,
        out_max as i64,
    );
    if config.clamp_output {
        percent = percent.clamp(0, 100);
    }

    Ok(NormalizedReading(percent as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorPolarity;

    fn reading(samples: &[u16]) -> Reading {
        Reading::from_samples(samples).unwrap()
    }

    #[test]
    fn test_dry_bound_reads_full_scale() {
        let config = SensorConfig::DEFAULT;
        let value = normalize(&reading(&[265; 5]), &config).unwrap();
        assert_eq!(value, NormalizedReading(100));
    }

    #[test]
    fn test_wet_bound_reads_zero() {
        let config = SensorConfig::DEFAULT;
        let value = normalize(&reading(&[830; 5]), &config).unwrap();
        assert_eq!(value, NormalizedReading(0));
    }

    #[test]
    fn test_midpoint_truncates_toward_zero() {
        // mean 500: (500 - 265) * -100 / 565 = -41.59 -> -41, + 100 = 59
        let config = SensorConfig::DEFAULT;
        let value = normalize(&reading(&[500; 5]), &config).unwrap();
        assert_eq!(value.value(), 59);
    }

    #[test]
    fn test_mean_uses_fractional_sum() {
        // 265 * 4 + 266 = 1326, mean 265.2 -> 265 before remapping
        let samples = reading(&[265, 265, 265, 265, 266]);
        assert_eq!(samples.mean(), Some(265.2));
        let value = normalize(&samples, &SensorConfig::DEFAULT).unwrap();
        assert_eq!(value.value(), 100);
    }

    #[test]
    fn test_out_of_range_is_not_clamped_by_default() {
        let config = SensorConfig::DEFAULT;
        let below = normalize(&reading(&[100; 5]), &config).unwrap();
        let above = normalize(&reading(&[1000; 5]), &config).unwrap();
        // (100 - 265) * -100 / 565 = 29.2 -> 29, + 100
        assert_eq!(below.value(), 129);
        // (1000 - 265) * -100 / 565 = -130.08 -> -130, + 100
        assert_eq!(above.value(), -30);
    }

    #[test]
    fn test_clamp_output_limits_range() {
        let config = SensorConfig {
            clamp_output: true,
            ..SensorConfig::DEFAULT
        };
        assert_eq!(normalize(&reading(&[100; 5]), &config).unwrap().value(), 100);
        assert_eq!(normalize(&reading(&[1000; 5]), &config).unwrap().value(), 0);
    }

    #[test]
    fn test_direct_polarity() {
        let config = SensorConfig {
            polarity: SensorPolarity::Direct,
            ..SensorConfig::DEFAULT
        };
        assert_eq!(normalize(&reading(&[265; 5]), &config).unwrap().value(), 0);
        assert_eq!(normalize(&reading(&[830; 5]), &config).unwrap().value(), 100);
    }

    #[test]
    fn test_degenerate_sample_folds_into_average() {
        // one zero reading among dry readings: mean 212, above full scale
        let value = normalize(&reading(&[265, 265, 265, 265, 0]), &SensorConfig::DEFAULT).unwrap();
        // (212 - 265) * -100 / 565 = 9.38 -> 9, + 100
        assert_eq!(value.value(), 109);
    }

    #[test]
    fn test_empty_reading_is_rejected() {
        let result = normalize(&Reading::default(), &SensorConfig::DEFAULT);
        assert!(matches!(result, Err(SensorError::InvalidCalibration { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let zero = SensorConfig {
            measurements: 0,
            ..SensorConfig::DEFAULT
        };
        let flat = SensorConfig {
            raw_max: 265,
            ..SensorConfig::DEFAULT
        };
        let huge = SensorConfig {
            measurements: MAX_MEASUREMENTS + 1,
            ..SensorConfig::DEFAULT
        };
        assert!(validate(&zero).is_err());
        assert!(validate(&flat).is_err());
        assert!(validate(&huge).is_err());
        assert!(validate(&SensorConfig::DEFAULT).is_ok());
    }

    #[test]
    fn test_map_range_matches_integer_remap() {
        assert_eq!(map_range(265, 265, 830, 100, 0), 100);
        assert_eq!(map_range(830, 265, 830, 100, 0), 0);
        assert_eq!(map_range(5, 0, 10, 0, 100), 50);
    }
}
