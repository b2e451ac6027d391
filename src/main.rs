// Temperature reporter firmware
// Reads DS18B20 probes, shows them on the OLED and reports to temperatur.nu

mod api;
mod config;
mod device_info;
mod mode_button;
mod oled;
mod onewire_bus;
mod portal;
mod reset_handler;
mod watchdog;
mod wifi_client;
mod wifi_storage;

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::IOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use tempreporter_shared::canvas::GraphicsCanvas;
use tempreporter_shared::connectivity::{ConnectivityManager, Restarter};
use tempreporter_shared::device::{Device, UploadOutcome};
use tempreporter_shared::ds18b20::Ds18b20Array;
use tempreporter_shared::watchdog::Watchdog;

use api::EspHttpTransport;
use mode_button::ModeButton;
use oled::Oled;
use onewire_bus::GpioOneWire;
use reset_handler::EspRestarter;
use watchdog::TaskWatchdog;
use wifi_client::EspWifiProvisioner;

const I2C_FREQ_HZ: u32 = 400_000;
/// WiFi, TLS and the portal server do not fit the default main task stack
const APP_STACK_SIZE: usize = 16 * 1024;
/// Main loop tick; bounds button latency
const LOOP_TICK: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("🌡️ Temperature reporter starting");

    let _app = thread::Builder::new()
        .name("app".into())
        .stack_size(APP_STACK_SIZE)
        .spawn(|| {
            if let Err(e) = run() {
                error!("❌ Startup failed: {:?}", e);
                EspRestarter.restart();
            }
        })?;

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

/// Brings up the hardware, connects, then runs the read-render-upload loop forever
fn run() -> Result<()> {
    let config = config::load();
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // OLED shield: SDA GPIO21, SCL GPIO22
    let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_FREQ_HZ));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &i2c_config,
    )?;
    let canvas = GraphicsCanvas::new(Oled::new(i2c)?);

    // Probes on GPIO4
    let bus = GpioOneWire::new(peripherals.pins.gpio4.downgrade())?;
    let sensors = Ds18b20Array::new(bus, FreeRtos);

    let identity = device_info::device_identity();
    let wifi = EspWifiProvisioner::new(peripherals.modem, sys_loop, nvs, config.connect_timeout)?;
    let connectivity = ConnectivityManager::new(wifi, EspRestarter, identity);

    let watchdog = TaskWatchdog::configure(config.watchdog_timeout)?;
    let transport = EspHttpTransport::new(config.http_timeout);
    let mut button = ModeButton::new(peripherals.pins.gpio0)?;

    let mut device = Device::new(canvas, sensors, connectivity, transport, &watchdog, &config);
    device.boot();

    // Subscribed only now; provisioning may legitimately take minutes
    watchdog.enable();
    info!("✅ Setup complete, entering main loop");

    let mut next_cycle = Instant::now();
    loop {
        watchdog.feed();
        let now = Instant::now();

        if button.was_pressed(now) {
            device.switch_screen_mode();
        }

        if now >= next_cycle {
            if device.run_cycle(now) == UploadOutcome::Failed {
                warn!("Upload failed, next attempt in {:?}", config.upload_interval);
            }
            next_cycle = now + config.poll_interval;
        }

        thread::sleep(LOOP_TICK);
    }
}
