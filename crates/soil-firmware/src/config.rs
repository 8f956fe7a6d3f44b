//! Node configuration compiled into the firmware

use soil_core::config::{DeviceConfig, MeshConfig, NodeConfig};

include!(concat!(env!("OUT_DIR"), "/node_config.rs"));

pub const NODE_CONFIG: NodeConfig<'static> = NodeConfig {
    mesh: MESH,
    device: DeviceConfig {
        name: DEVICE_NAME,
        ..DeviceConfig::DEFAULT
    },
    ..NodeConfig::DEFAULT
};
