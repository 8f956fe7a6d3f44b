//! Wake-cycle state machine
//!
//! One boot of the node is one wake cycle:
//!
//! ```text
//! AwaitingConnectivity --bridge found--> ConnectivityFound --grace elapsed--> ReadyToSleep
//!          |                                                                      ^
//!          +-------------------------- connect timeout ---------------------------+
//! ```
//!
//! The controller is polled; it never blocks. Each [`LifecycleController::tick`]
//! polls the transport (which may raise the connectivity signal), reacts to the
//! event, then compares the deadlines against the clock. Announcement and
//! state are sent once, synchronously, when the bridge is found. Entering
//! `ReadyToSleep` hands over to the [`PowerManager`] exactly once.

use alloc::string::String;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::announce::{
    AnnounceError, DeviceIdentity, Topic, build_announcement_document, build_state_document,
    to_json,
};
use crate::clock::Clock;
use crate::config::{NodeConfig, TimingConfig};
use crate::power::{PowerManager, PowerPlatform};
use crate::sensors::{NormalizedReading, Sampler};
use crate::transport::{ConnectivityEvent, ConnectivitySignal, MeshTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePhase {
    AwaitingConnectivity,
    ConnectivityFound,
    ReadyToSleep,
}

/// Why a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    /// No bridge within the connect timeout; nothing was sent
    BridgeTimeout,
    /// Announcement and state were handed to the transport
    Published,
}

/// Mutable state of the current wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeCycleState {
    pub cycle_start: Instant,
    pub connectivity_found: bool,
    pub connectivity_event_time: Option<Instant>,
}

impl WakeCycleState {
    pub const fn new(cycle_start: Instant) -> Self {
        Self {
            cycle_start,
            connectivity_found: false,
            connectivity_event_time: None,
        }
    }
}

/// Summary logged right before power-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub reason: SleepReason,
    pub messages_sent: u8,
    pub send_failures: u8,
    pub awake: Duration,
}

pub struct LifecycleController<'a, T, S, C, P> {
    transport: T,
    sampler: S,
    clock: C,
    power: PowerManager<P>,
    identity: DeviceIdentity<'a>,
    timing: TimingConfig,
    connectivity: ConnectivitySignal,
    state: WakeCycleState,
    phase: WakePhase,
    messages_sent: u8,
    send_failures: u8,
    report: Option<CycleReport>,
}

impl<'a, T, S, C, P> LifecycleController<'a, T, S, C, P>
where
    T: MeshTransport,
    S: Sampler,
    C: Clock,
    P: PowerPlatform,
{
    /// Join the mesh and start the cycle clock.
    ///
    /// A transport that fails to initialise is logged and left alone: the
    /// cycle then simply times out and sleeps.
    pub fn boot(
        mut transport: T,
        sampler: S,
        clock: C,
        platform: P,
        config: &NodeConfig<'a>,
    ) -> Self {
        if let Err(e) = transport.init(&config.mesh) {
            warn!("Mesh init failed: {:?}", e);
        }

        let identity = DeviceIdentity::new(&config.device, transport.node_id());
        let cycle_start = clock.now();
        info!(
            "Wake cycle started: node {} ({}), waiting up to {} s for a bridge",
            identity.node_id,
            identity.name,
            config.timing.connect_timeout_secs
        );

        Self {
            transport,
            sampler,
            clock,
            power: PowerManager::new(platform, config.timing.sleep()),
            identity,
            timing: config.timing,
            connectivity: ConnectivitySignal::new(),
            state: WakeCycleState::new(cycle_start),
            phase: WakePhase::AwaitingConnectivity,
            messages_sent: 0,
            send_failures: 0,
            report: None,
        }
    }

    pub fn phase(&self) -> WakePhase {
        self.phase
    }

    pub fn state(&self) -> &WakeCycleState {
        &self.state
    }

    pub fn identity(&self) -> &DeviceIdentity<'a> {
        &self.identity
    }

    pub fn report(&self) -> Option<CycleReport> {
        self.report
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn power(&self) -> &PowerManager<P> {
        &self.power
    }

    /// Advance the state machine by one poll
    pub fn tick(&mut self) -> WakePhase {
        if self.phase == WakePhase::ReadyToSleep {
            return self.phase;
        }

        self.transport.update(&self.connectivity);
        if let Some(event) = self.connectivity.try_take() {
            match self.phase {
                WakePhase::AwaitingConnectivity => self.on_connectivity(event),
                _ => debug!("Ignoring repeated bridge notification from {}", event.bridge_id),
            }
        }

        let now = self.clock.now();
        match self.phase {
            WakePhase::AwaitingConnectivity => {
                let waited = now.saturating_duration_since(self.state.cycle_start);
                if waited > self.timing.connect_timeout() {
                    info!("No bridge after {} ms, going back to sleep", waited.as_millis());
                    self.enter_sleep(SleepReason::BridgeTimeout, now);
                }
            }
            WakePhase::ConnectivityFound => {
                let since_send = self
                    .state
                    .connectivity_event_time
                    .map(|sent| now.saturating_duration_since(sent));
                if matches!(since_send, Some(elapsed) if elapsed > self.timing.grace()) {
                    self.enter_sleep(SleepReason::Published, now);
                }
            }
            WakePhase::ReadyToSleep => {}
        }

        self.phase
    }

    /// Tick until the cycle ends, calling `between_ticks` after every poll
    /// that leaves the node awake.
    pub fn run_until_sleep(&mut self, mut between_ticks: impl FnMut()) -> CycleReport {
        loop {
            if self.tick() == WakePhase::ReadyToSleep {
                if let Some(report) = self.report {
                    return report;
                }
            }
            between_ticks();
        }
    }

    fn on_connectivity(&mut self, event: ConnectivityEvent) {
        info!("Bridge {} available, publishing", event.bridge_id);
        self.state.connectivity_found = true;
        self.phase = WakePhase::ConnectivityFound;

        self.introduce();
        self.measure_and_send();

        self.state.connectivity_event_time = Some(self.clock.now());
    }

    fn introduce(&mut self) {
        match self.announcement_message() {
            Ok((topic, payload)) => {
                debug!("Config message: {}", payload);
                self.send(&topic, &payload);
            }
            Err(e) => warn!("Could not build announcement: {}", e),
        }
    }

    fn measure_and_send(&mut self) {
        let reading = match self.sampler.sample() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Measurement failed, no state sent: {}", e);
                return;
            }
        };

        match self.state_message(reading) {
            Ok((topic, payload)) => {
                debug!("State message: {}", payload);
                self.send(&topic, &payload);
            }
            Err(e) => warn!("Could not build state document: {}", e),
        }
    }

    fn announcement_message(&self) -> Result<(Topic, String), AnnounceError> {
        let document = build_announcement_document(&self.identity)?;
        Ok((self.identity.config_topic()?, to_json(&document)?))
    }

    fn state_message(&self, reading: NormalizedReading) -> Result<(Topic, String), AnnounceError> {
        let document = build_state_document(reading);
        Ok((self.identity.state_topic()?, to_json(&document)?))
    }

    fn send(&mut self, topic: &str, payload: &str) {
        match self.transport.send_message(topic, payload) {
            Ok(()) => self.messages_sent = self.messages_sent.saturating_add(1),
            Err(e) => {
                self.send_failures = self.send_failures.saturating_add(1);
                warn!("Send to {} failed: {:?}", topic, e);
            }
        }
    }

    fn enter_sleep(&mut self, reason: SleepReason, now: Instant) {
        self.phase = WakePhase::ReadyToSleep;

        let report = CycleReport {
            reason,
            messages_sent: self.messages_sent,
            send_failures: self.send_failures,
            awake: now.saturating_duration_since(self.state.cycle_start),
        };
        self.report = Some(report);
        info!(
            "Awake for {} ms, {} message(s) sent",
            report.awake.as_millis(),
            report.messages_sent
        );

        self.power.enter_deep_sleep(&mut self.transport);
    }
}
