//! The broker-side consumer: prints everything published and keeps track of
//! the devices that announced themselves.

use std::collections::BTreeMap;

use log::{info, warn};
use serde_json::Value;

#[derive(Debug, Default)]
pub struct Collector {
    pub messages: Vec<(String, String)>,
    /// unique_id -> state topic
    pub devices: BTreeMap<String, String>,
}

impl Collector {
    pub fn receive(&mut self, topic: &str, payload: &str) {
        info!("[collector] {}: {}", topic, payload);

        if topic.ends_with("/config") {
            match serde_json::from_str::<Value>(payload) {
                Ok(config) => {
                    let id = config["unique_id"].as_str().unwrap_or_default().to_owned();
                    let state_topic = config["stat_t"].as_str().unwrap_or_default().to_owned();
                    info!(
                        "[collector] discovered '{}' ({}) on {}",
                        config["name"].as_str().unwrap_or("?"),
                        id,
                        state_topic
                    );
                    self.devices.insert(id, state_topic);
                }
                Err(e) => warn!("[collector] bad config document on {}: {}", topic, e),
            }
        }

        self.messages.push((topic.to_owned(), payload.to_owned()));
    }

    /// Last moisture value published on `state_topic`
    pub fn latest_moisture(&self, state_topic: &str) -> Option<i64> {
        self.messages
            .iter()
            .rev()
            .find(|(topic, _)| topic == state_topic)
            .and_then(|(_, payload)| serde_json::from_str::<Value>(payload).ok())
            .and_then(|state| state["moisture"].as_i64())
    }
}
