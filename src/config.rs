//! Node configuration parameters.
//!
//! All tunable parameters for the sensor node.  Network settings are
//! normally injected at build time by the binary; everything else uses the
//! defaults below unless a JSON document overrides it.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins;
use crate::sensors::analog::MAX_SAMPLES;

/// Upper bound on debounced digital inputs per node.
pub const MAX_BINARY_CHANNELS: usize = 4;

/// Channel names double as payload keys, so they stay short.
pub type ChannelName = String<16>;

/// Light (analog) channel parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogChannelConfig {
    pub pin: i32,
    /// Number of slots in the moving-average buffer.
    pub capacity: usize,
    /// Readings closer together than this are skipped (milliseconds).
    pub min_interval_ms: u64,
}

/// Debounced digital channel parameters (motion, door switches).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryChannelConfig {
    /// Payload key, e.g. `motion` → `{"motion":1}` / `motionSessionLength`.
    pub name: ChannelName,
    pub pin: i32,
    /// Minimum time a raw level must hold before it is reported.
    pub settle_ms: u64,
    /// Active-low wiring: report the inverse of the pin level.
    #[serde(default)]
    pub invert: bool,
}

impl BinaryChannelConfig {
    pub fn new(name: &str, pin: i32, settle_ms: u64) -> Self {
        let mut n = ChannelName::new();
        // Names longer than the buffer are truncated at a char boundary.
        for c in name.chars() {
            if n.push(c).is_err() {
                break;
            }
        }
        Self {
            name: n,
            pin,
            settle_ms,
            invert: false,
        }
    }
}

/// Core node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Network ---
    pub ssid: String<32>,
    pub wifi_password: String<64>,
    /// `mqtt://host:port`
    pub broker_url: String<96>,
    pub out_topic: String<64>,
    pub in_topic: String<64>,
    /// The chip id (hex) is appended to form the MQTT client id.
    pub client_id_prefix: String<24>,
    /// Reported as `sw` in the controller-info announcement.
    pub software_name: String<48>,

    // --- Channels ---
    pub light: AnalogChannelConfig,
    pub binary: Vec<BinaryChannelConfig, MAX_BINARY_CHANNELS>,

    // --- Timing (milliseconds unless noted) ---
    /// Interval between light-average publishes.
    pub publish_interval_ms: u64,
    /// Delay between failed broker handshakes.
    pub reconnect_backoff_ms: u64,
    /// Maximum time spent reconnecting before the node restarts.
    pub watchdog_timeout_ms: u64,
    /// Task watchdog timeout for the main loop (seconds).
    pub loop_watchdog_secs: u32,
    /// Deep sleep after each periodic publish.  `None` = stay awake.
    pub deep_sleep_secs: Option<u32>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut binary = Vec::new();
        // Capacity is 4; three defaults always fit.
        let _ = binary.push(BinaryChannelConfig::new("motion", pins::MOTION_GPIO, 1));
        let _ = binary.push(BinaryChannelConfig::new("switch", pins::SWITCH_GPIO, 1));
        let _ = binary.push(BinaryChannelConfig::new(
            "switchWomen",
            pins::SWITCH_WOMEN_GPIO,
            1,
        ));

        Self {
            ssid: String::new(),
            wifi_password: String::new(),
            broker_url: short("mqtt://192.168.1.10:1883"),
            out_topic: short("sensornode/out"),
            in_topic: short("sensornode/in"),
            client_id_prefix: short("sensornode-"),
            software_name: short("sensornode"),

            light: AnalogChannelConfig {
                pin: pins::LIGHT_ADC_GPIO,
                capacity: 30,
                min_interval_ms: 50,
            },
            binary,

            publish_interval_ms: 30_000,
            reconnect_backoff_ms: 5_000,
            watchdog_timeout_ms: 60_000,
            loop_watchdog_secs: 10,
            deep_sleep_secs: None,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON document"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject parameters the channels and session manager cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.light.capacity == 0 {
            return Err(Error::InvalidChannelConfig("sample capacity must be non-zero"));
        }
        if self.light.capacity > MAX_SAMPLES {
            return Err(Error::InvalidChannelConfig("sample capacity exceeds buffer"));
        }
        if self.light.min_interval_ms == 0 {
            return Err(Error::InvalidChannelConfig("sample interval must be positive"));
        }
        for ch in &self.binary {
            if ch.settle_ms == 0 {
                return Err(Error::InvalidChannelConfig("settle time must be positive"));
            }
            if ch.name.is_empty() {
                return Err(Error::InvalidChannelConfig("channel name must not be empty"));
            }
        }
        if self.publish_interval_ms == 0 {
            return Err(Error::Config("publish interval must be positive"));
        }
        if self.reconnect_backoff_ms == 0 || self.watchdog_timeout_ms == 0 {
            return Err(Error::Config("reconnect timings must be positive"));
        }
        if self.out_topic.is_empty() || self.in_topic.is_empty() {
            return Err(Error::Config("topics must not be empty"));
        }
        Ok(())
    }
}

/// Build a bounded string from a literal known to fit.
fn short<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    let _ = out.push_str(s);
    out
}
