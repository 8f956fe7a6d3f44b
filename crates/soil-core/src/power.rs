//! Deep sleep entry
//!
//! Powering down is the only teardown a wake cycle has: the transport is
//! stopped, the radio switched off and the chip halted on a wake-up timer.
//! The next boot starts a fresh cycle.

use embassy_time::Duration;
use log::{info, warn};

use crate::transport::MeshTransport;

/// Chip-level power controls
pub trait PowerPlatform {
    /// Switch the wireless radio off
    fn radio_off(&mut self);

    /// Halt in the lowest power state until the wake-up timer fires.
    ///
    /// On hardware this never returns.
    fn halt(&mut self, duration: Duration);
}

pub struct PowerManager<P> {
    platform: P,
    sleep_duration: Duration,
    entered: bool,
}

impl<P: PowerPlatform> PowerManager<P> {
    pub fn new(platform: P, sleep_duration: Duration) -> Self {
        Self {
            platform,
            sleep_duration,
            entered: false,
        }
    }

    pub fn has_entered_sleep(&self) -> bool {
        self.entered
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Stop `transport`, disable the radio and halt for the configured duration.
    ///
    /// Only the first call has any effect.
    pub fn enter_deep_sleep<T: MeshTransport>(&mut self, transport: &mut T) {
        if self.entered {
            warn!("Deep sleep already requested, ignoring");
            return;
        }
        self.entered = true;

        info!("Entering deep sleep for {} s", self.sleep_duration.as_secs());
        transport.stop();
        self.platform.radio_off();
        self.platform.halt(self.sleep_duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshConfig;
    use crate::transport::ConnectivitySignal;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct FakePlatform(Log);

    impl PowerPlatform for FakePlatform {
        fn radio_off(&mut self) {
            self.0.borrow_mut().push("radio_off");
        }

        fn halt(&mut self, _duration: Duration) {
            self.0.borrow_mut().push("halt");
        }
    }

    struct FakeTransport(Log);

    impl MeshTransport for FakeTransport {
        type Error = Infallible;

        fn init(&mut self, _config: &MeshConfig<'_>) -> Result<(), Self::Error> {
            Ok(())
        }

        fn update(&mut self, _connectivity: &ConnectivitySignal) {}

        fn stop(&mut self) {
            self.0.borrow_mut().push("stop");
        }

        fn node_id(&self) -> u32 {
            1
        }

        fn send_message(&mut self, _topic: &str, _payload: &str) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_teardown_order() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut transport = FakeTransport(log.clone());
        let mut power = PowerManager::new(FakePlatform(log.clone()), Duration::from_secs(900));

        power.enter_deep_sleep(&mut transport);

        assert_eq!(log.borrow().as_slice(), &["stop", "radio_off", "halt"]);
        assert!(power.has_entered_sleep());
    }

    #[test]
    fn test_second_request_is_ignored() {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut transport = FakeTransport(log.clone());
        let mut power = PowerManager::new(FakePlatform(log.clone()), Duration::from_secs(900));

        power.enter_deep_sleep(&mut transport);
        power.enter_deep_sleep(&mut transport);

        let halts = log.borrow().iter().filter(|&&e| e == "halt").count();
        assert_eq!(halts, 1);
    }
}
