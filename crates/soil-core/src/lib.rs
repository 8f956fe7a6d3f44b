//! Hardware-independent core library for soil-node
//!
//! This crate contains all platform-agnostic logic for the battery-powered
//! moisture node: the wake-cycle state machine, sensor sampling and
//! normalization, discovery/state document building, the power-down
//! sequence, and the mesh transport seam with its on-air frame codec.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod announce;
pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod power;
pub mod sensors;
pub mod transport;
