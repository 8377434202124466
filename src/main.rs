//! Sensor node firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter   MqttTransport      EspPlatform            │
//! │  (SensorPort)      (SessionTransport) (PlatformPort)         │
//! │  WifiAdapter ──▶ LinkEvents           MonotonicClock         │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │              Node (pure logic)                     │      │
//! │  │  AnalogChannel · BinaryChannel · SessionManager    │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyInputPin, PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, error, info, warn};

use sensornode::adapters::device_id;
use sensornode::adapters::hardware::HardwareAdapter;
use sensornode::adapters::mqtt::MqttTransport;
use sensornode::adapters::platform::EspPlatform;
use sensornode::adapters::time::MonotonicClock;
use sensornode::adapters::wifi::WifiAdapter;
use sensornode::app::service::{Node, Ports};
use sensornode::config::NodeConfig;
use sensornode::drivers::hw_init;
use sensornode::drivers::watchdog::Watchdog;
use sensornode::error::Error;
use sensornode::pins;
use sensornode::session::link::LinkEvents;

/// Filled by the WiFi event handler, drained by the session manager.
static LINK_EVENTS: LinkEvents = LinkEvents::new();

// ── Build-time configuration ──────────────────────────────────

fn override_str<const N: usize>(
    field: &mut heapless::String<N>,
    value: Option<&'static str>,
    name: &'static str,
) -> Result<()> {
    if let Some(v) = value {
        field.clear();
        field
            .push_str(v)
            .map_err(|()| anyhow!("{} longer than {} bytes", name, N))?;
    }
    Ok(())
}

fn build_config() -> Result<NodeConfig> {
    let mut config = match option_env!("SENSORNODE_CONFIG_JSON") {
        Some(json) => NodeConfig::from_json(json)?,
        None => NodeConfig::default(),
    };
    override_str(&mut config.ssid, option_env!("SENSORNODE_WIFI_SSID"), "SSID")?;
    override_str(
        &mut config.wifi_password,
        option_env!("SENSORNODE_WIFI_PASSWORD"),
        "WiFi password",
    )?;
    override_str(
        &mut config.broker_url,
        option_env!("SENSORNODE_BROKER_URL"),
        "broker URL",
    )?;
    config.validate()?;
    Ok(config)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorNode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = build_config()?;
    let clock = MonotonicClock::new();
    let chip_id = device_id::chip_id(&device_id::read_mac());
    info!("Chip id: {:x}", chip_id);

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(pins::LIGHT_ADC_CHANNEL)
        .map_err(|e| anyhow!("HAL init failed: {}", e))?;
    let watchdog = Watchdog::new(config.loop_watchdog_secs);

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut hw = HardwareAdapter::new(config.light.pin, pins::LIGHT_ADC_CHANNEL);
    info!("Light sensor on GPIO {} (ADC1 CH{})", config.light.pin, hw.adc_channel());
    for ch in &config.binary {
        // SAFETY: each configured GPIO is claimed exactly once, here.
        let pin = unsafe { AnyInputPin::new(ch.pin) };
        let mut input = PinDriver::input(pin)?;
        input.set_pull(Pull::Down)?;
        hw.bind_input(ch.pin, input)?;
        info!("Input '{}' on GPIO {}", ch.name, ch.pin);
    }

    // ── 3. Network ────────────────────────────────────────────
    let mut wifi = WifiAdapter::new();
    wifi.set_credentials(&config.ssid, &config.wifi_password)
        .map_err(Error::from)?;
    wifi.start(peripherals.modem, sysloop, nvs, &LINK_EVENTS)?;

    let transport = MqttTransport::new(&config.broker_url);
    let mut node = Node::new(config, chip_id, &LINK_EVENTS, clock.now_ms())?;
    let mut io = Ports {
        sensors: hw,
        transport,
        platform: EspPlatform::new(),
    };

    info!("System ready. Entering event loop.");

    // ── 4. Event loop ─────────────────────────────────────────
    loop {
        watchdog.feed();

        match node.tick(clock.now_ms(), &mut io) {
            Ok(report) if report.published > 0 || report.dropped > 0 => {
                debug!(
                    "tick {}: published {}, dropped {}",
                    node.tick_count(),
                    report.published,
                    report.dropped
                );
            }
            Ok(_) => {}
            Err(Error::ReconnectExhausted) => {
                // The platform restart does not return on hardware.
                error!("Reconnect watchdog expired");
                return Err(Error::ReconnectExhausted.into());
            }
            Err(e) => warn!("tick failed: {}", e),
        }

        // Cooperative yield: lets the WiFi/MQTT tasks and IDLE run.
        FreeRtos::delay_ms(1);
    }
}
