//! Discovery and state documents
//!
//! The collector discovers nodes from a config document published next to
//! the state topic. Its key names and order are fixed by the discovery
//! protocol the collector speaks, so they are reproduced exactly here.

use alloc::string::{String, ToString};
use core::fmt::Write;

use serde::Serialize;
use thiserror_no_std::Error;

use crate::config::DeviceConfig;
use crate::sensors::NormalizedReading;

pub const DEVICE_CLASS: &str = "humidity";
pub const UNIT_OF_MEASUREMENT: &str = "%";
pub const VALUE_TEMPLATE: &str = "{{ value_json.moisture}}";

/// Capacity of a topic path
pub const TOPIC_CAPACITY: usize = 64;

pub type Topic = heapless::String<TOPIC_CAPACITY>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceError {
    #[error("Topic path exceeds 64 bytes")]
    TopicTooLong,
    #[error("Document could not be encoded")]
    Encode,
}

/// Static identity of this node on the mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity<'a> {
    pub name: &'a str,
    pub device_type: &'a str,
    pub node_id: u32,
}

impl<'a> DeviceIdentity<'a> {
    pub fn new(device: &DeviceConfig<'a>, node_id: u32) -> Self {
        Self {
            name: device.name,
            device_type: device.device_type,
            node_id,
        }
    }

    /// `devices/<device_type>/<node_id>/<leaf>`
    fn topic(&self, leaf: &str) -> Result<Topic, AnnounceError> {
        let mut topic = Topic::new();
        write!(topic, "devices/{}/{}/{}", self.device_type, self.node_id, leaf)
            .map_err(|_| AnnounceError::TopicTooLong)?;
        Ok(topic)
    }

    pub fn state_topic(&self) -> Result<Topic, AnnounceError> {
        self.topic("state")
    }

    pub fn config_topic(&self) -> Result<Topic, AnnounceError> {
        self.topic("config")
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePayload {
    pub moisture: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Announcement<'a> {
    pub name: &'a str,
    pub unique_id: String,
    pub device_class: &'static str,
    pub stat_t: String,
    pub unit_of_measurement: &'static str,
    pub frc_upd: bool,
    pub value_template: &'static str,
}

pub fn build_state_document(reading: NormalizedReading) -> StatePayload {
    StatePayload {
        moisture: reading.value(),
    }
}

pub fn build_announcement_document<'a>(
    identity: &DeviceIdentity<'a>,
) -> Result<Announcement<'a>, AnnounceError> {
    Ok(Announcement {
        name: identity.name,
        unique_id: identity.node_id.to_string(),
        device_class: DEVICE_CLASS,
        stat_t: String::from(identity.state_topic()?.as_str()),
        unit_of_measurement: UNIT_OF_MEASUREMENT,
        frc_upd: true,
        value_template: VALUE_TEMPLATE,
    })
}

/// Compact JSON text of a document
pub fn to_json<T: Serialize>(document: &T) -> Result<String, AnnounceError> {
    serde_json::to_string(document).map_err(|_| AnnounceError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;

    fn identity() -> DeviceIdentity<'static> {
        DeviceIdentity::new(&DeviceConfig::DEFAULT, 2_147_483_647)
    }

    #[test]
    fn test_topics_follow_device_type_and_node_id() {
        let id = identity();
        assert_eq!(id.state_topic().unwrap().as_str(), "devices/sensor/2147483647/state");
        assert_eq!(id.config_topic().unwrap().as_str(), "devices/sensor/2147483647/config");
    }

    #[test]
    fn test_topics_are_stable_across_calls() {
        let first = identity();
        let second = identity();
        assert_eq!(first.state_topic(), second.state_topic());
        assert_eq!(first.config_topic(), second.config_topic());
    }

    #[test]
    fn test_overlong_device_type_is_rejected() {
        let id = DeviceIdentity {
            name: "x",
            device_type: "a-device-type-label-that-is-far-too-long-for-a-topic",
            node_id: 1,
        };
        assert_eq!(id.state_topic(), Err(AnnounceError::TopicTooLong));
    }

    #[test]
    fn test_state_document_json() {
        let full = to_json(&build_state_document(NormalizedReading(100))).unwrap();
        let empty = to_json(&build_state_document(NormalizedReading(0))).unwrap();
        assert_eq!(full, r#"{"moisture":100}"#);
        assert_eq!(empty, r#"{"moisture":0}"#);
    }

    #[test]
    fn test_announcement_json_is_byte_exact() {
        let id = DeviceIdentity::new(&DeviceConfig::DEFAULT, 3_141_592);
        let json = to_json(&build_announcement_document(&id).unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"name":"Moisture Sensor","unique_id":"3141592","device_class":"humidity","#,
                r#""stat_t":"devices/sensor/3141592/state","unit_of_measurement":"%","#,
                r#""frc_upd":true,"value_template":"{{ value_json.moisture}}"}"#
            )
        );
    }
}
