//! ESP-NOW mesh transport
//!
//! The node listens for bridge beacons carrying its mesh prefix. The first
//! matching beacon registers the bridge as an encrypted peer and raises the
//! connectivity event; publishes are then sent to the bridge directly and
//! waited on, so nothing is left queued when the node stops.

use esp_radio::esp_now::{EspNow, EspNowError, EspNowWifiInterface, PeerInfo};
use heapless::String;
use log::{debug, info, warn};
use thiserror_no_std::Error;

use soil_core::config::{MeshConfig, MeshDebug};
use soil_core::transport::{
    ConnectivityEvent, ConnectivitySignal, FrameError, MAX_FRAME_LEN, MeshFrame, MeshTransport,
    mesh_key, node_id_from_mac,
};

const PREFIX_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum EspNowMeshError {
    #[error("No bridge reachable")]
    NotJoined,
    #[error("Mesh prefix longer than 32 bytes")]
    PrefixTooLong,
    #[error("Frame error: {0}")]
    Frame(FrameError),
    #[error("Radio error: {0:?}")]
    Radio(EspNowError),
}

impl From<FrameError> for EspNowMeshError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<EspNowError> for EspNowMeshError {
    fn from(e: EspNowError) -> Self {
        Self::Radio(e)
    }
}

pub struct EspNowMesh<'d> {
    esp_now: EspNow<'d>,
    mac: [u8; 6],
    prefix: String<PREFIX_CAPACITY>,
    key: [u8; 16],
    channel: u8,
    debug: MeshDebug,
    bridge: Option<[u8; 6]>,
    stopped: bool,
}

impl<'d> EspNowMesh<'d> {
    pub fn new(esp_now: EspNow<'d>, mac: [u8; 6]) -> Self {
        Self {
            esp_now,
            mac,
            prefix: String::new(),
            key: [0; 16],
            channel: MeshConfig::DEFAULT.channel,
            debug: MeshDebug::Error,
            bridge: None,
            stopped: false,
        }
    }

    fn register_bridge(&mut self, address: [u8; 6]) -> Result<(), EspNowError> {
        if !self.esp_now.peer_exists(&address) {
            self.esp_now.add_peer(PeerInfo {
                interface: EspNowWifiInterface::Sta,
                peer_address: address,
                lmk: Some(self.key),
                channel: Some(self.channel),
                encrypt: true,
            })?;
        }
        self.bridge = Some(address);
        Ok(())
    }
}

impl MeshTransport for EspNowMesh<'_> {
    type Error = EspNowMeshError;

    fn init(&mut self, config: &MeshConfig<'_>) -> Result<(), Self::Error> {
        self.prefix.clear();
        self.prefix
            .push_str(config.prefix)
            .map_err(|_| EspNowMeshError::PrefixTooLong)?;
        self.key = mesh_key(config.password);
        self.channel = config.channel;
        self.debug = config.debug;

        self.esp_now.set_channel(config.channel)?;
        self.esp_now.set_pmk(&self.key)?;

        info!(
            "ESP-NOW up on channel {}, waiting for a bridge of '{}'",
            config.channel, config.prefix
        );
        Ok(())
    }

    fn update(&mut self, connectivity: &ConnectivitySignal) {
        if self.stopped {
            return;
        }

        while let Some(received) = self.esp_now.receive() {
            let frame = match MeshFrame::decode(received.data()) {
                Ok(frame) => frame,
                Err(e) => {
                    if self.debug != MeshDebug::Error {
                        debug!("Ignoring frame from {:02x?}: {}", received.info.src_address, e);
                    }
                    continue;
                }
            };
            if self.debug == MeshDebug::Verbose {
                debug!("Received {:?}", frame);
            }

            let Some(bridge_id) = frame.beacon_for(&self.prefix) else {
                continue;
            };
            if self.bridge.is_some() {
                continue;
            }
            let address = received.info.src_address;
            match self.register_bridge(address) {
                Ok(()) => {
                    if self.debug != MeshDebug::Error {
                        info!("Bridge {} found at {:02x?}", bridge_id, address);
                    }
                    connectivity.signal(ConnectivityEvent { bridge_id });
                }
                Err(e) => warn!("Could not add bridge {} as peer: {:?}", bridge_id, e),
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        if let Some(bridge) = self.bridge.take() {
            if let Err(e) = self.esp_now.remove_peer(&bridge) {
                warn!("Failed to remove bridge peer: {:?}", e);
            }
        }
        self.stopped = true;
        info!("Left mesh");
    }

    fn node_id(&self) -> u32 {
        node_id_from_mac(self.mac)
    }

    fn send_message(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        let bridge = match self.bridge {
            Some(bridge) if !self.stopped => bridge,
            _ => return Err(EspNowMeshError::NotJoined),
        };
        let frame = MeshFrame::Publish {
            origin: self.node_id(),
            topic,
            payload,
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = frame.encode(&mut buf)?;
        self.esp_now.send(&bridge, bytes)?.wait()?;
        Ok(())
    }
}
