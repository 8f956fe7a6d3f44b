#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::{ClientConfig, ModeConfig};
use rtt_target::rprintln;
use static_cell::StaticCell;

use soil_core::clock::SystemClock;
use soil_core::lifecycle::LifecycleController;
use soil_core::sensors::MoistureSampler;
use soil_firmware::config::NODE_CONFIG;
use soil_firmware::esp_now_mesh::EspNowMesh;
use soil_firmware::power::EspPower;
use soil_firmware::probe::ProbeAdc;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Probe: power rail on GPIO2, signal on GPIO1
    let rail = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let mut adc_config = AdcConfig::new();
    let probe_pin = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
    let adc = Adc::new(peripherals.ADC1, adc_config);
    let sampler = MoistureSampler::new(
        rail,
        ProbeAdc::new(adc, probe_pin),
        Delay::new(),
        NODE_CONFIG.sensor,
    );

    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize radio controller"));
    let (mut wifi, interfaces) = esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
        .expect("Failed to initialize Wi-Fi controller");
    wifi.set_config(&ModeConfig::Client(ClientConfig::default()))
        .expect("Failed to configure station mode");
    wifi.start().expect("Failed to start Wi-Fi");

    let mac = interfaces.sta.mac_address();
    let transport = EspNowMesh::new(interfaces.esp_now, mac);
    let power = EspPower::new(Rtc::new(peripherals.LPWR), wifi);

    let mut controller =
        LifecycleController::boot(transport, sampler, SystemClock, power, &NODE_CONFIG);

    // Deep sleep resets the chip, so the cycle never returns here
    loop {
        controller.tick();
        embassy_futures::yield_now().await;
    }
}
