//! MQTT session transport.
//!
//! Implements [`SessionTransport`] over the ESP-IDF MQTT client.  The
//! client runs its own network task; its event callback only flips the
//! connection flag and queues inbound messages on a bounded
//! [`InboundQueue`], which [`poll`] drains on the main loop.  Messages
//! that do not fit (queue full, topic or body too long) are dropped and
//! logged.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-memory broker stand-in for host tests.
//!
//! All messages go out at QoS 0 (at most once, never retained).
//!
//! [`poll`]: SessionTransport::poll

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{debug, info, warn};

use crate::app::ports::SessionTransport;

/// Upper bound on the wait for the broker's CONNACK inside `connect()`.
pub const CONNECT_WAIT_MS: u64 = 2_000;

pub const INBOUND_QUEUE_CAP: usize = 4;
pub const MAX_TOPIC_LEN: usize = 64;
pub const MAX_INBOUND_LEN: usize = 256;

pub type InboundMessage = (
    heapless::String<MAX_TOPIC_LEN>,
    heapless::Vec<u8, MAX_INBOUND_LEN>,
);
pub type InboundQueue = Channel<CriticalSectionRawMutex, InboundMessage, INBOUND_QUEUE_CAP>;

/// Copy one received message into the queue.  Returns `false` if it was
/// dropped.
pub fn enqueue_inbound(queue: &InboundQueue, topic: &str, data: &[u8]) -> bool {
    let mut t = heapless::String::new();
    if t.push_str(topic).is_err() {
        warn!("MQTT: inbound topic too long, dropped");
        return false;
    }
    let Ok(body) = heapless::Vec::from_slice(data) else {
        warn!("MQTT: {} byte message on '{}' too long, dropped", data.len(), topic);
        return false;
    };
    if queue.try_send((t, body)).is_err() {
        warn!("MQTT: inbound queue full, dropped message on '{}'", topic);
        return false;
    }
    true
}

fn drain_inbound(queue: &InboundQueue, on_message: &mut dyn FnMut(&str, &[u8])) {
    while let Ok((topic, data)) = queue.try_receive() {
        on_message(&topic, &data);
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
    };

    use super::*;

    pub struct MqttTransport {
        url: heapless::String<96>,
        client: Option<EspMqttClient<'static>>,
        connected: Arc<AtomicBool>,
        inbound: Arc<InboundQueue>,
    }

    impl MqttTransport {
        pub fn new(url: &str) -> Self {
            let mut u = heapless::String::new();
            let _ = u.push_str(url);
            Self {
                url: u,
                client: None,
                connected: Arc::new(AtomicBool::new(false)),
                inbound: Arc::new(Channel::new()),
            }
        }

        fn start_client(&mut self, client_id: &str) -> bool {
            let conf = MqttClientConfiguration {
                client_id: Some(client_id),
                ..Default::default()
            };
            let connected = self.connected.clone();
            let inbound = self.inbound.clone();

            let result = EspMqttClient::new_cb(&self.url, &conf, move |event| {
                match event.payload() {
                    EventPayload::Connected(_) => connected.store(true, Ordering::Release),
                    EventPayload::Disconnected => connected.store(false, Ordering::Release),
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        ..
                    } => {
                        enqueue_inbound(&inbound, topic, data);
                    }
                    _ => {}
                }
            });

            match result {
                Ok(client) => {
                    self.client = Some(client);
                    true
                }
                Err(e) => {
                    warn!("MQTT: client start failed: {:?}", e);
                    false
                }
            }
        }
    }

    impl SessionTransport for MqttTransport {
        fn connect(&mut self, client_id: &str) -> bool {
            if self.client.is_none() && !self.start_client(client_id) {
                return false;
            }
            // The client reconnects on its own; wait a bounded time for it.
            let deadline = Instant::now() + Duration::from_millis(CONNECT_WAIT_MS);
            while !self.is_connected() {
                if Instant::now() >= deadline {
                    debug!("MQTT: no CONNACK within {} ms", CONNECT_WAIT_MS);
                    return false;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            info!("MQTT: connected to {}", self.url);
            true
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Acquire)
        }

        fn subscribe(&mut self, topic: &str) -> bool {
            let Some(client) = self.client.as_mut() else {
                return false;
            };
            match client.subscribe(topic, QoS::AtMostOnce) {
                Ok(_) => true,
                Err(e) => {
                    warn!("MQTT: subscribe '{}' failed: {:?}", topic, e);
                    false
                }
            }
        }

        fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
            let Some(client) = self.client.as_mut() else {
                return false;
            };
            match client.enqueue(topic, QoS::AtMostOnce, false, payload) {
                Ok(_) => true,
                Err(e) => {
                    warn!("MQTT: publish '{}' failed: {:?}", topic, e);
                    false
                }
            }
        }

        fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
            drain_inbound(&self.inbound, on_message);
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::MqttTransport;

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct MqttTransport {
    url: heapless::String<96>,
    broker_up: bool,
    connected: bool,
    subscriptions: Vec<String>,
    outbox: Vec<(String, Vec<u8>)>,
    inbox: InboundQueue,
}

#[cfg(not(target_os = "espidf"))]
impl MqttTransport {
    pub fn new(url: &str) -> Self {
        let mut u = heapless::String::new();
        let _ = u.push_str(url);
        Self {
            url: u,
            broker_up: true,
            connected: false,
            subscriptions: Vec::new(),
            outbox: Vec::new(),
            inbox: Channel::new(),
        }
    }

    /// Simulation: take the broker down (drops the session) or bring it up.
    pub fn set_broker_up(&mut self, up: bool) {
        self.broker_up = up;
        if !up {
            self.connected = false;
        }
    }

    /// Simulation: queue a message as if the broker had sent it.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.subscriptions.iter().any(|s| s == topic)
            && enqueue_inbound(&self.inbox, topic, payload)
    }

    /// Simulation: everything published so far.
    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.outbox
    }
}

#[cfg(not(target_os = "espidf"))]
impl SessionTransport for MqttTransport {
    fn connect(&mut self, client_id: &str) -> bool {
        self.connected = self.broker_up;
        if self.connected {
            self.subscriptions.clear();
            info!("MQTT(sim): '{}' connected to {}", client_id, self.url);
        } else {
            debug!("MQTT(sim): broker {} unreachable", self.url);
        }
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        if !self.connected {
            return false;
        }
        self.subscriptions.push(topic.to_owned());
        true
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected {
            warn!("MQTT(sim): publish '{}' while offline", topic);
            return false;
        }
        self.outbox.push((topic.to_owned(), payload.to_vec()));
        true
    }

    fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8])) {
        drain_inbound(&self.inbox, on_message);
    }
}
