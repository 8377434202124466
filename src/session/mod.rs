//! Broker session manager.
//!
//! Keeps one MQTT session alive across WiFi drops and broker outages.
//!
//! ```text
//!                  next tick            connect() ok
//!  Disconnected ─────────────▶ Connecting ─────────────▶ Connected
//!       ▲                       │  ▲                         │
//!       │                       └──┘ connect() failed or     │ link down,
//!       │                            link down: wait         │ session lost,
//!       └────────────────────────────────────────────────────┘ publish failed
//!
//!  not Connected for longer than the watchdog ──▶ RestartRequested (terminal)
//! ```
//!
//! The manager is driven by [`SessionManager::tick`] from the main loop
//! and never blocks: the backoff between handshakes is a scheduled
//! timestamp, and the watchdog is an elapsed-time check.  The watchdog
//! counts from boot or from the moment a session was lost, and keeps
//! counting while the link is down: handshakes are only skipped.  When it
//! fires the manager asks the platform to restart exactly once and
//! refuses to do anything afterwards.
//!
//! On every successful handshake the manager subscribes to the inbound
//! topic and announces the controller info, including how long the node
//! was offline beforehand.
//!
//! Publishing is best-effort and at-most-once: while the session is down
//! messages are dropped, not buffered.

pub mod link;

use core::fmt::Write;
use core::net::Ipv4Addr;

use log::{debug, error, info, warn};

use crate::app::events::{ControllerInfo, PublishEvent};
use crate::app::payload;
use crate::app::ports::{PlatformPort, SessionTransport};
use crate::config::NodeConfig;
use crate::error::{Error, Result};
use link::{LinkEvents, NetworkEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// The reconnect watchdog fired and a restart was requested.
    RestartRequested,
}

pub struct SessionManager<'a> {
    link: &'a LinkEvents,
    state: SessionState,
    link_up: bool,
    ip: Option<Ipv4Addr>,

    chip_id: u32,
    client_id: heapless::String<48>,
    out_topic: heapless::String<64>,
    in_topic: heapless::String<64>,
    ssid: heapless::String<32>,
    software: heapless::String<48>,

    backoff_ms: u64,
    watchdog_ms: u64,
    next_attempt_ms: u64,
    attempts: u32,

    /// Set while the session is down; cleared on connect.  Also the
    /// watchdog's reference point.
    offline_since_ms: Option<u64>,
    /// Duration of the outage preceding the current session.
    last_offline_ms: u64,
    inbound_count: u32,
}

impl<'a> SessionManager<'a> {
    /// `now_ms` marks the start of the first offline period (boot).
    pub fn new(link: &'a LinkEvents, config: &NodeConfig, chip_id: u32, now_ms: u64) -> Self {
        let mut client_id = heapless::String::new();
        // Prefix is at most 24 bytes, the id at most 8.
        let _ = write!(client_id, "{}{:x}", config.client_id_prefix, chip_id);

        Self {
            link,
            state: SessionState::Disconnected,
            link_up: false,
            ip: None,
            chip_id,
            client_id,
            out_topic: config.out_topic.clone(),
            in_topic: config.in_topic.clone(),
            ssid: config.ssid.clone(),
            software: config.software_name.clone(),
            backoff_ms: config.reconnect_backoff_ms,
            watchdog_ms: config.watchdog_timeout_ms,
            next_attempt_ms: now_ms,
            attempts: 0,
            offline_since_ms: Some(now_ms),
            last_offline_ms: 0,
            inbound_count: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Handshakes attempted in the current reconnect cycle.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_offline_ms(&self) -> u64 {
        self.last_offline_ms
    }

    pub fn inbound_count(&self) -> u32 {
        self.inbound_count
    }

    // ── Per-tick driver ───────────────────────────────────────

    /// Advance the session state machine.
    ///
    /// Returns `Err(Error::ReconnectExhausted)` once the watchdog has
    /// fired, on that tick and every tick after it.
    pub fn tick(
        &mut self,
        now_ms: u64,
        transport: &mut impl SessionTransport,
        platform: &mut impl PlatformPort,
    ) -> Result<()> {
        self.drain_link_events();

        match self.state {
            SessionState::RestartRequested => return Err(Error::ReconnectExhausted),
            SessionState::Connected => {
                if self.link_up && transport.is_connected() {
                    let mut inbound = 0;
                    transport.poll(&mut |topic, body| {
                        inbound += 1;
                        info!(
                            "Message arrived [{}] {}",
                            topic,
                            String::from_utf8_lossy(body)
                        );
                    });
                    self.inbound_count = self.inbound_count.wrapping_add(inbound);
                    return Ok(());
                }
                warn!("Session: lost broker connection");
                self.enter_disconnected(now_ms);
            }
            _ => {}
        }

        if self.state == SessionState::Disconnected {
            info!("Session: connecting as '{}'", self.client_id);
            self.state = SessionState::Connecting;
            self.next_attempt_ms = now_ms;
            self.attempts = 0;
        }

        self.drive_reconnect(now_ms, transport, platform)
    }

    /// Publish one sensor report.
    ///
    /// While the session is down the report is dropped and
    /// `Err(Error::TransportUnavailable)` is returned; the transport is not
    /// touched.  A failed send drops the session.
    pub fn publish(
        &mut self,
        now_ms: u64,
        transport: &mut impl SessionTransport,
        event: &PublishEvent<'_>,
    ) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::TransportUnavailable);
        }
        let body = payload::encode_event(self.chip_id, event)?;
        self.send(now_ms, transport, &body)?;
        info!(
            "Publish message: {}",
            core::str::from_utf8(&body).unwrap_or("<binary>")
        );
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────

    fn drain_link_events(&mut self) {
        while let Some(event) = self.link.next() {
            match event {
                NetworkEvent::LinkUp { at_ms, ip } => {
                    info!("Station connected, IP: {} (t={}ms)", ip, at_ms);
                    self.link_up = true;
                    self.ip = Some(ip);
                }
                NetworkEvent::LinkDown { at_ms } => {
                    info!("Station disconnected (t={}ms)", at_ms);
                    self.link_up = false;
                    if self.state == SessionState::Connected {
                        self.enter_disconnected(at_ms);
                    }
                }
            }
        }
    }

    fn drive_reconnect(
        &mut self,
        now_ms: u64,
        transport: &mut impl SessionTransport,
        platform: &mut impl PlatformPort,
    ) -> Result<()> {
        let offline_for = self
            .offline_since_ms
            .map_or(0, |since| now_ms.saturating_sub(since));
        if offline_for > self.watchdog_ms {
            error!(
                "Session: no broker after {} ms ({} attempts), restarting",
                offline_for, self.attempts
            );
            self.state = SessionState::RestartRequested;
            platform.restart();
            return Err(Error::ReconnectExhausted);
        }

        if !self.link_up || now_ms < self.next_attempt_ms {
            return Ok(());
        }

        self.attempts += 1;
        info!("Attempting MQTT connection (attempt {})...", self.attempts);

        if !transport.connect(&self.client_id) {
            warn!("Session: handshake failed, try again in {} ms", self.backoff_ms);
            self.next_attempt_ms = now_ms.saturating_add(self.backoff_ms);
            return Ok(());
        }
        if !transport.subscribe(&self.in_topic) {
            warn!(
                "Session: subscribe to '{}' failed, try again in {} ms",
                self.in_topic, self.backoff_ms
            );
            self.next_attempt_ms = now_ms.saturating_add(self.backoff_ms);
            return Ok(());
        }

        self.last_offline_ms = self
            .offline_since_ms
            .take()
            .map_or(0, |since| now_ms.saturating_sub(since));
        self.state = SessionState::Connected;
        info!(
            "Session: connected after {} attempt(s), offline {} ms",
            self.attempts, self.last_offline_ms
        );

        self.announce(now_ms, transport, platform);
        Ok(())
    }

    /// Send the three controller-info messages.
    fn announce(
        &mut self,
        now_ms: u64,
        transport: &mut impl SessionTransport,
        platform: &impl PlatformPort,
    ) {
        let info = ControllerInfo {
            chip_id: self.chip_id,
            free_heap: platform.free_heap(),
            ip: self.ip,
            ssid: self.ssid.as_str(),
            software: self.software.as_str(),
            offline_ms: self.last_offline_ms,
            reset_reason: platform.reset_reason(),
        };
        let messages = match payload::encode_controller_info(&info) {
            Ok(m) => m,
            Err(e) => {
                warn!("Session: controller info not sent: {}", e);
                return;
            }
        };
        for body in &messages {
            if let Err(e) = self.send(now_ms, transport, body) {
                debug!("Session: controller info interrupted: {}", e);
                return;
            }
            info!(
                "Publish message: {}",
                core::str::from_utf8(body).unwrap_or("<binary>")
            );
        }
    }

    fn send(
        &mut self,
        now_ms: u64,
        transport: &mut impl SessionTransport,
        body: &[u8],
    ) -> Result<()> {
        if transport.publish(&self.out_topic, body) {
            return Ok(());
        }
        warn!("Session: publish to '{}' failed, dropping session", self.out_topic);
        self.enter_disconnected(now_ms);
        Err(Error::TransportUnavailable)
    }

    fn enter_disconnected(&mut self, at_ms: u64) {
        if self.state == SessionState::RestartRequested {
            return;
        }
        self.state = SessionState::Disconnected;
        self.offline_since_ms.get_or_insert(at_ms);
    }
}
