//! Bakes the mesh credentials and device name into the firmware.
//!
//! Values come from the environment or a `.env` file next to this crate and
//! fall back to the defaults compiled into `soil-core`.

use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_PREFIX: &str = "ESP Mesh";
const DEFAULT_PASSWORD: &str = "somethingSneaky";
const DEFAULT_CHANNEL: u8 = 6;
const DEFAULT_DEVICE_NAME: &str = "Moisture Sensor";

fn var(name: &str) -> Option<String> {
    println!("cargo:rerun-if-env-changed={name}");
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn main() {
    println!("cargo:rerun-if-changed=.env");
    // A missing .env is fine, the defaults apply
    let _ = dotenvy::dotenv();

    let prefix = var("SOIL_MESH_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_owned());
    let password = var("SOIL_MESH_PASSWORD").unwrap_or_else(|| DEFAULT_PASSWORD.to_owned());
    let channel = match var("SOIL_MESH_CHANNEL") {
        Some(raw) => match raw.parse::<u8>() {
            Ok(channel @ 1..=14) => channel,
            _ => panic!("SOIL_MESH_CHANNEL must be a WiFi channel 1-14, got {raw:?}"),
        },
        None => DEFAULT_CHANNEL,
    };
    let device_name = var("SOIL_DEVICE_NAME").unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_owned());

    let generated = format!(
        "/// Mesh parameters baked in at build time\n\
         pub const MESH: MeshConfig<'static> = MeshConfig {{\n    \
             prefix: {prefix:?},\n    \
             password: {password:?},\n    \
             channel: {channel},\n    \
             ..MeshConfig::DEFAULT\n\
         }};\n\
         \n\
         pub const DEVICE_NAME: &str = {device_name:?};\n"
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::write(out_dir.join("node_config.rs"), generated).expect("Failed to write node_config.rs");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
