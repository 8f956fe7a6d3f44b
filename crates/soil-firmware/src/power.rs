use embassy_time::Duration;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use esp_radio::wifi::WifiController;
use log::warn;

use soil_core::power::PowerPlatform;

/// RTC deep sleep with a timer wake-up
pub struct EspPower<'d> {
    rtc: Rtc<'d>,
    wifi: WifiController<'d>,
}

impl<'d> EspPower<'d> {
    pub fn new(rtc: Rtc<'d>, wifi: WifiController<'d>) -> Self {
        Self { rtc, wifi }
    }
}

impl PowerPlatform for EspPower<'_> {
    fn radio_off(&mut self) {
        if let Err(e) = self.wifi.stop() {
            warn!("Failed to stop radio: {:?}", e);
        }
    }

    fn halt(&mut self, duration: Duration) {
        let timer = TimerWakeupSource::new(core::time::Duration::from_secs(duration.as_secs()));
        self.rtc.sleep_deep(&[&timer]);
    }
}
