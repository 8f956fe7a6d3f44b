//! Compile-time configuration for a soil-node deployment
//!
//! Every wake cycle starts from these values; nothing here is written back.
//! The defaults match the field deployment (capacitive probe on a 10-bit ADC,
//! bridge on channel 6, fifteen minute sleep).

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

/// Maximum number of raw samples a single measurement may take.
pub const MAX_MEASUREMENTS: usize = 32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct NodeConfig<'a> {
    pub mesh: MeshConfig<'a>,
    pub device: DeviceConfig<'a>,
    pub sensor: SensorConfig,
    pub timing: TimingConfig,
}

impl NodeConfig<'static> {
    pub const DEFAULT: Self = Self {
        mesh: MeshConfig::DEFAULT,
        device: DeviceConfig::DEFAULT,
        sensor: SensorConfig::DEFAULT,
        timing: TimingConfig::DEFAULT,
    };
}

impl Default for NodeConfig<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Verbosity of the transport's own diagnostics
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshDebug {
    /// Only errors
    Error,
    /// Errors, startup and connection changes
    Connection,
    /// Every frame in and out
    Verbose,
}

/// Network identity and radio parameters shared by every node of one mesh
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeshConfig<'a> {
    pub prefix: &'a str,
    pub password: &'a str,
    pub port: u16,
    pub channel: u8,
    /// The mesh is known to contain a root (the bridge), so nodes keep
    /// searching for it instead of electing one among themselves.
    pub contains_root: bool,
    pub debug: MeshDebug,
}

impl MeshConfig<'static> {
    pub const DEFAULT: Self = Self {
        prefix: "ESP Mesh",
        password: "somethingSneaky",
        port: 5555,
        channel: 6,
        contains_root: true,
        debug: MeshDebug::Connection,
    };
}

/// How the node presents itself to the collector
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeviceConfig<'a> {
    /// Human readable name shown by the collector
    pub name: &'a str,
    /// Device-type label used in topic paths
    pub device_type: &'a str,
}

impl DeviceConfig<'static> {
    pub const DEFAULT: Self = Self {
        name: "Moisture Sensor",
        device_type: "sensor",
    };
}

/// Direction of the raw-to-percentage mapping
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPolarity {
    /// `raw_min` maps to 100 and `raw_max` to 0 (capacitive probes read lower when wet)
    Inverted,
    /// `raw_min` maps to 0 and `raw_max` to 100
    Direct,
}

impl SensorPolarity {
    /// Output values at (`raw_min`, `raw_max`)
    pub const fn output_range(self) -> (i32, i32) {
        match self {
            Self::Inverted => (100, 0),
            Self::Direct => (0, 100),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Raw readings averaged per measurement
    pub measurements: usize,
    /// Calibration bounds in raw ADC counts
    pub raw_min: i32,
    pub raw_max: i32,
    pub polarity: SensorPolarity,
    /// Clamp the normalized value into 0..=100. Off by default: readings past
    /// the calibration bounds are published as-is.
    pub clamp_output: bool,
    /// Delay between powering the probe and the first read
    pub settle_ms: u32,
}

impl SensorConfig {
    pub const DEFAULT: Self = Self {
        measurements: 5,
        raw_min: 265,
        raw_max: 830,
        polarity: SensorPolarity::Inverted,
        clamp_output: false,
        settle_ms: 0,
    };
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Give up on finding the bridge after this long
    pub connect_timeout_secs: u64,
    /// Time left for outbound frames to leave the radio before power-down
    pub grace_ms: u64,
    /// Deep sleep duration between wake cycles
    pub sleep_secs: u64,
}

impl TimingConfig {
    pub const DEFAULT: Self = Self {
        connect_timeout_secs: 6,
        grace_ms: 100,
        sleep_secs: 900,
    };

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub const fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub const fn sleep(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
