use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Largest payload a single ESP-NOW frame can carry
pub const MAX_FRAME_LEN: usize = 250;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame exceeds {0} bytes")]
    TooLarge(usize),
    #[error("Malformed frame")]
    Malformed,
}

/// On-air envelope exchanged between nodes and the bridge
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFrame<'a> {
    /// Broadcast by the bridge while it has a broker connection
    BridgeBeacon { mesh: &'a str, bridge_id: u32 },
    /// A message the bridge republishes on `topic`
    Publish {
        origin: u32,
        topic: &'a str,
        payload: &'a str,
    },
}

impl<'a> MeshFrame<'a> {
    pub fn encode<'b>(&self, buf: &'b mut [u8; MAX_FRAME_LEN]) -> Result<&'b [u8], FrameError> {
        match postcard::to_slice(self, buf) {
            Ok(used) => Ok(&*used),
            Err(postcard::Error::SerializeBufferFull) => Err(FrameError::TooLarge(MAX_FRAME_LEN)),
            Err(_) => Err(FrameError::Malformed),
        }
    }

    pub fn decode(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge(MAX_FRAME_LEN));
        }
        postcard::from_bytes(bytes).map_err(|_| FrameError::Malformed)
    }

    /// Bridge id if this is a beacon for `mesh`
    pub fn beacon_for(&self, mesh: &str) -> Option<u32> {
        match *self {
            Self::BridgeBeacon {
                mesh: beacon_mesh,
                bridge_id,
            } if beacon_mesh == mesh => Some(bridge_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::{DeviceIdentity, build_announcement_document, to_json};
    use crate::config::DeviceConfig;

    #[test]
    fn test_publish_frame_decodes_to_same_fields() {
        let frame = MeshFrame::Publish {
            origin: 42,
            topic: "devices/sensor/42/state",
            payload: r#"{"moisture":57}"#,
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = frame.encode(&mut buf).unwrap();

        assert_eq!(MeshFrame::decode(bytes).unwrap(), frame);
    }

    #[test]
    fn test_largest_announcement_fits_in_one_frame() {
        let id = DeviceIdentity::new(&DeviceConfig::DEFAULT, u32::MAX);
        let topic = id.config_topic().unwrap();
        let payload = to_json(&build_announcement_document(&id).unwrap()).unwrap();
        let frame = MeshFrame::Publish {
            origin: u32::MAX,
            topic: topic.as_str(),
            payload: payload.as_str(),
        };

        let mut buf = [0u8; MAX_FRAME_LEN];
        assert!(frame.encode(&mut buf).is_ok());
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let payload = "x".repeat(MAX_FRAME_LEN);
        let frame = MeshFrame::Publish {
            origin: 1,
            topic: "t",
            payload: payload.as_str(),
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        assert_eq!(frame.encode(&mut buf), Err(FrameError::TooLarge(MAX_FRAME_LEN)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(MeshFrame::decode(&[0xff, 0xff, 0xff]), Err(FrameError::Malformed));
    }

    #[test]
    fn test_beacon_matches_only_own_mesh() {
        let beacon = MeshFrame::BridgeBeacon {
            mesh: "ESP Mesh",
            bridge_id: 7,
        };
        assert_eq!(beacon.beacon_for("ESP Mesh"), Some(7));
        assert_eq!(beacon.beacon_for("Other Mesh"), None);

        let publish = MeshFrame::Publish {
            origin: 7,
            topic: "t",
            payload: "p",
        };
        assert_eq!(publish.beacon_for("ESP Mesh"), None);
    }
}
