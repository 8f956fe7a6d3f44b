use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::peripherals::{ADC1, GPIO1};
use log::warn;

use soil_core::sensors::AnalogInput;

/// Moisture probe wired to GPIO1 on ADC1
pub struct ProbeAdc<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
}

impl<'d> ProbeAdc<'d> {
    pub fn new(adc: Adc<'d, ADC1<'d>, Blocking>, pin: AdcPin<GPIO1<'d>, ADC1<'d>>) -> Self {
        Self { adc, pin }
    }
}

impl AnalogInput for ProbeAdc<'_> {
    fn read_raw(&mut self) -> u16 {
        match nb::block!(self.adc.read_oneshot(&mut self.pin)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("ADC read failed: {:?}", e);
                0
            }
        }
    }
}
