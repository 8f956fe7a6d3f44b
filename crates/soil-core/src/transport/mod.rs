//! Mesh transport seam
//!
//! Routing, topology and the bridge to the broker live outside this crate.
//! The controller only needs to poll the transport, learn when a bridge is
//! reachable, hand it text messages, and shut it down.

mod frame;

pub use frame::*;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;

use crate::config::MeshConfig;

/// A path to the collector exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    /// Node id of the bridge that answered
    pub bridge_id: u32,
}

/// Single-slot event raised by the transport from inside [`MeshTransport::update`].
///
/// Everything runs on the poll loop's stack, so no locking is needed.
pub type ConnectivitySignal = Signal<NoopRawMutex, ConnectivityEvent>;

pub trait MeshTransport {
    type Error: core::fmt::Debug;

    /// Join the mesh described by `config`
    fn init(&mut self, config: &MeshConfig<'_>) -> Result<(), Self::Error>;

    /// Process pending radio traffic. Raises `connectivity` when a bridge
    /// becomes reachable.
    fn update(&mut self, connectivity: &ConnectivitySignal);

    /// Leave the mesh, flushing anything still queued
    fn stop(&mut self);

    fn node_id(&self) -> u32;

    /// Queue a message for the bridge. Success means the message was
    /// accepted, not that it was delivered.
    fn send_message(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;
}

impl<T: MeshTransport + ?Sized> MeshTransport for &mut T {
    type Error = T::Error;

    fn init(&mut self, config: &MeshConfig<'_>) -> Result<(), Self::Error> {
        (**self).init(config)
    }

    fn update(&mut self, connectivity: &ConnectivitySignal) {
        (**self).update(connectivity)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn node_id(&self) -> u32 {
        (**self).node_id()
    }

    fn send_message(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
        (**self).send_message(topic, payload)
    }
}

/// Mesh node id for a station MAC: the low four bytes, big-endian
pub const fn node_id_from_mac(mac: [u8; 6]) -> u32 {
    u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]])
}

/// Link key derived from the mesh password: its first 16 bytes, zero padded
pub fn mesh_key(password: &str) -> [u8; 16] {
    let mut key = [0u8; 16];
    let bytes = password.as_bytes();
    let len = bytes.len().min(key.len());
    key[..len].copy_from_slice(&bytes[..len]);
    key
}
