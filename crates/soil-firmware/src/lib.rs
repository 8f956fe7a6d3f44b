//! ESP32-S3 bindings for soil-node
//!
//! Implements the `soil-core` hardware seams on top of esp-hal and
//! esp-radio: the probe ADC, ESP-NOW as the mesh transport and RTC deep
//! sleep.

#![no_std]

extern crate alloc;

pub mod config;
pub mod esp_now_mesh;
pub mod power;
pub mod probe;
