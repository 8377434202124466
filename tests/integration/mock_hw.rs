//! Mock adapters for integration tests.
//!
//! Sensors are scripted per pin, the broker records every call, and the
//! platform records restart / sleep requests, so tests can assert on the
//! full history without touching real GPIO or sockets.

use std::collections::HashMap;

use sensornode::app::ports::{PlatformPort, ResetReason, SensorPort, SessionTransport};
use sensornode::error::SensorError;

// ── Sensors ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockSensors {
    pub analog: HashMap<i32, f32>,
    pub digital: HashMap<i32, bool>,
    /// Pins whose reads fail.
    pub broken: Vec<i32>,
    pub analog_reads: Vec<i32>,
}

#[allow(dead_code)]
impl MockSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_analog(&mut self, pin: i32, value: f32) {
        self.analog.insert(pin, value);
    }

    pub fn set_digital(&mut self, pin: i32, high: bool) {
        self.digital.insert(pin, high);
    }
}

impl SensorPort for MockSensors {
    fn read_analog(&mut self, pin: i32) -> Result<f32, SensorError> {
        self.analog_reads.push(pin);
        if self.broken.contains(&pin) {
            return Err(SensorError::AdcReadFailed);
        }
        self.analog.get(&pin).copied().ok_or(SensorError::UnknownPin(pin))
    }

    fn read_digital(&mut self, pin: i32) -> Result<bool, SensorError> {
        if self.broken.contains(&pin) {
            return Err(SensorError::GpioReadFailed);
        }
        Ok(self.digital.get(&pin).copied().unwrap_or(false))
    }
}

// ── Broker ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Connect(String),
    Subscribe(String),
    Publish { topic: String, payload: String },
}

pub struct MockBroker {
    /// Whether the next handshake succeeds.
    pub reachable: bool,
    pub connected: bool,
    pub calls: Vec<BrokerCall>,
    pub inbound: Vec<(String, Vec<u8>)>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable,
            connected: false,
            calls: Vec::new(),
            inbound: Vec::new(),
        }
    }

    pub fn connects(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BrokerCall::Connect(_)))
            .count()
    }

    /// Payloads of every publish, in order.
    pub fn payloads(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Publish { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Publishes that are not controller-info announcements.
    pub fn sensor_payloads(&self) -> Vec<String> {
        self.payloads()
            .into_iter()
            .filter(|p| !p.contains("freeHeap") && !p.contains("\"sw\"") && !p.contains("resetReason"))
            .collect()
    }

    /// Drop the session as if the broker had gone away.
    pub fn drop_session(&mut self) {
        self.connected = false;
        self.reachable = false;
    }
}

impl SessionTransport for MockBroker {
    fn connect(&mut self, client_id: &str) -> bool {
        self.calls.push(BrokerCall::Connect(client_id.to_owned()));
        self.connected = self.reachable;
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        self.calls.push(BrokerCall::Subscribe(topic.to_owned()));
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.calls.push(BrokerCall::Publish {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        });
        self.connected
    }

    fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        for (topic, body) in self.inbound.drain(..) {
            on_message(&topic, &body);
        }
    }
}

// ── Platform ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPlatform {
    pub restarts: u32,
    pub sleeps: Vec<u32>,
}

impl PlatformPort for MockPlatform {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn deep_sleep(&mut self, secs: u32) {
        self.sleeps.push(secs);
    }

    fn free_heap(&self) -> u32 {
        42_000
    }

    fn reset_reason(&self) -> ResetReason {
        ResetReason::Software
    }
}
