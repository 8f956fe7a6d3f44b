//! In-process mesh: one node, one bridge, frames passed as encoded bytes so the
//! on-air codec is exercised exactly as on hardware.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use soil_core::config::{MeshConfig, MeshDebug};
use soil_core::transport::{
    ConnectivityEvent, ConnectivitySignal, FrameError, MAX_FRAME_LEN, MeshFrame, MeshTransport,
    node_id_from_mac,
};

use crate::collector::Collector;

#[derive(Debug)]
pub enum SimMeshError {
    NotJoined,
    Frame(FrameError),
}

impl From<FrameError> for SimMeshError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

/// Root node that forwards publishes to the collector
pub struct SimulatedBridge {
    pub id: u32,
    pub mesh: String,
    /// `None`: the bridge never comes up
    pub available_after: Option<Duration>,
    pub collector: Rc<RefCell<Collector>>,
}

impl SimulatedBridge {
    fn is_up(&self, since_boot: Duration) -> bool {
        matches!(self.available_after, Some(after) if since_boot >= after)
    }

    fn beacon(&self, buf: &mut [u8; MAX_FRAME_LEN]) -> Result<usize, FrameError> {
        let frame = MeshFrame::BridgeBeacon {
            mesh: &self.mesh,
            bridge_id: self.id,
        };
        Ok(frame.encode(buf)?.len())
    }

    fn deliver(&self, bytes: &[u8]) {
        match MeshFrame::decode(bytes) {
            Ok(MeshFrame::Publish {
                origin,
                topic,
                payload,
            }) => {
                debug!("Bridge: frame from {} for {}", origin, topic);
                self.collector.borrow_mut().receive(topic, payload);
            }
            Ok(other) => debug!("Bridge: ignoring {:?}", other),
            Err(e) => warn!("Bridge: dropped frame: {}", e),
        }
    }
}

pub struct SimulatedMesh {
    mac: [u8; 6],
    bridge: SimulatedBridge,
    booted: Instant,
    prefix: Option<String>,
    debug: MeshDebug,
    outbox: VecDeque<Vec<u8>>,
    stopped: bool,
}

impl SimulatedMesh {
    pub fn new(mac: [u8; 6], bridge: SimulatedBridge) -> Self {
        Self {
            mac,
            bridge,
            booted: Instant::now(),
            prefix: None,
            debug: MeshDebug::Error,
            outbox: VecDeque::new(),
            stopped: false,
        }
    }

    fn flush(&mut self) {
        while let Some(frame) = self.outbox.pop_front() {
            self.bridge.deliver(&frame);
        }
    }
}

impl MeshTransport for SimulatedMesh {
    type Error = SimMeshError;

    fn init(&mut self, config: &MeshConfig<'_>) -> Result<(), Self::Error> {
        info!(
            "Joining mesh '{}' on channel {} (port {}, root expected: {})",
            config.prefix, config.channel, config.port, config.contains_root
        );
        self.prefix = Some(config.prefix.to_owned());
        self.debug = config.debug;
        self.booted = Instant::now();
        Ok(())
    }

    fn update(&mut self, connectivity: &ConnectivitySignal) {
        if self.stopped {
            return;
        }
        self.flush();

        let Some(prefix) = self.prefix.as_deref() else {
            return;
        };
        if !self.bridge.is_up(self.booted.elapsed()) {
            return;
        }

        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = match self.bridge.beacon(&mut buf) {
            Ok(len) => len,
            Err(e) => {
                warn!("Bridge beacon could not be encoded: {}", e);
                return;
            }
        };
        if let Ok(frame) = MeshFrame::decode(&buf[..len]) {
            if self.debug == MeshDebug::Verbose {
                debug!("Mesh: received {:?}", frame);
            }
            if let Some(bridge_id) = frame.beacon_for(prefix) {
                connectivity.signal(ConnectivityEvent { bridge_id });
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.flush();
        self.stopped = true;
        info!("Left mesh");
    }

    fn node_id(&self) -> u32 {
        node_id_from_mac(self.mac)
    }

    fn send_message(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        if self.prefix.is_none() || self.stopped {
            return Err(SimMeshError::NotJoined);
        }
        let frame = MeshFrame::Publish {
            origin: self.node_id(),
            topic,
            payload,
        };
        let mut buf = [0u8; MAX_FRAME_LEN];
        let bytes = frame.encode(&mut buf)?;
        self.outbox.push_back(bytes.to_vec());
        Ok(())
    }
}
