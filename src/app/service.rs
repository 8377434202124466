//! Application service: the event loop core.
//!
//! [`Node`] owns every piece of mutable device state and runs one
//! cooperative cycle per [`Node::tick`].  All I/O flows through the port
//! traits bundled in [`Ports`], so the whole loop runs on the host against
//! mock adapters and a simulated clock.
//!
//! ```text
//!  SensorPort ──▶ ┌────────────────────────────┐
//!                 │            Node            │ ──▶ SessionTransport
//!   LinkEvents ──▶│ sampler · debounce · timer │
//!                 └────────────────────────────┘ ──▶ PlatformPort
//! ```

use log::{debug, info, warn};

use crate::config::{MAX_BINARY_CHANNELS, NodeConfig};
use crate::error::{Error, Result};
use crate::sensors::{AnalogChannel, BinaryChannel, Level, Transition};
use crate::session::link::LinkEvents;
use crate::session::{SessionManager, SessionState};

use super::events::PublishEvent;
use super::ports::{PlatformPort, SensorPort, SessionTransport};

/// Payload key of the periodic analog report.
pub const LIGHT_KEY: &str = "light";

// ───────────────────────────────────────────────────────────────
// Ports & reports
// ───────────────────────────────────────────────────────────────

/// The adapters a tick talks to.
pub struct Ports<S, T, P> {
    pub sensors: S,
    pub transport: T,
    pub platform: P,
}

/// What a single tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// The light channel took (or tried to take) a reading.
    pub sampled: bool,
    /// Debounced edges seen across all binary channels.
    pub transitions: u8,
    /// Messages handed to the broker.
    pub published: u8,
    /// Messages dropped because the session was down.
    pub dropped: u8,
    /// The periodic light report was due this tick.
    pub periodic: bool,
    /// Deep sleep was requested.
    pub slept: bool,
}

// ───────────────────────────────────────────────────────────────
// DeviceState
// ───────────────────────────────────────────────────────────────

/// All state that lives for the whole process.
pub struct DeviceState<'a> {
    pub light: AnalogChannel,
    pub binary: heapless::Vec<BinaryChannel, MAX_BINARY_CHANNELS>,
    pub session: SessionManager<'a>,
    pub last_publish_ms: u64,
}

impl<'a> DeviceState<'a> {
    fn new(config: &NodeConfig, chip_id: u32, link: &'a LinkEvents, now_ms: u64) -> Result<Self> {
        let light = AnalogChannel::new(&config.light)?;
        let mut binary = heapless::Vec::new();
        for cfg in &config.binary {
            binary
                .push(BinaryChannel::new(cfg)?)
                .map_err(|_| Error::InvalidChannelConfig("too many binary channels"))?;
        }
        Ok(Self {
            light,
            binary,
            session: SessionManager::new(link, config, chip_id, now_ms),
            last_publish_ms: now_ms,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Node
// ───────────────────────────────────────────────────────────────

pub struct Node<'a> {
    state: DeviceState<'a>,
    config: NodeConfig,
    chip_id: u32,
    tick_count: u64,
}

impl<'a> Node<'a> {
    /// Validate the configuration and build every channel.
    ///
    /// `now_ms` starts the periodic-report timer and the first offline
    /// period.
    pub fn new(config: NodeConfig, chip_id: u32, link: &'a LinkEvents, now_ms: u64) -> Result<Self> {
        config.validate()?;
        let state = DeviceState::new(&config, chip_id, link, now_ms)?;
        info!(
            "Node {:x}: {} binary channel(s), light on GPIO {}",
            chip_id,
            state.binary.len(),
            state.light.pin()
        );
        Ok(Self {
            state,
            config,
            chip_id,
            tick_count: 0,
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cycle: session → light sample → edges → periodic report.
    ///
    /// Only `Err(Error::ReconnectExhausted)` escapes; every other failure
    /// is absorbed and logged.
    pub fn tick<S, T, P>(&mut self, now_ms: u64, io: &mut Ports<S, T, P>) -> Result<TickReport>
    where
        S: SensorPort,
        T: SessionTransport,
        P: PlatformPort,
    {
        self.tick_count += 1;
        let mut report = TickReport::default();
        let DeviceState {
            light,
            binary,
            session,
            last_publish_ms,
        } = &mut self.state;

        // 1. Session housekeeping
        session.tick(now_ms, &mut io.transport, &mut io.platform)?;

        // 2. Light sampling (rate-gated inside the channel)
        let sensors = &mut io.sensors;
        report.sampled = light.sample(|pin| sensors.read_analog(pin), now_ms);

        // 3. Edge detection, reported immediately
        for ch in binary.iter_mut() {
            let event = match ch.poll(|pin| sensors.read_digital(pin), now_ms) {
                Transition::NoChange => continue,
                Transition::Rose => PublishEvent::level(ch.name(), true),
                Transition::Fell { session_ms } => PublishEvent::fall(ch.name(), session_ms),
            };
            report.transitions += 1;
            deliver(session, now_ms, &mut io.transport, &event, &mut report);
        }

        // 4. Periodic light report
        if now_ms.saturating_sub(*last_publish_ms) > self.config.publish_interval_ms {
            *last_publish_ms = now_ms;
            report.periodic = true;
            match light.average() {
                Ok(avg) => {
                    let event = PublishEvent::number(LIGHT_KEY, avg);
                    deliver(session, now_ms, &mut io.transport, &event, &mut report);
                }
                Err(e) => warn!("{}: skipping report: {}", LIGHT_KEY, e),
            }

            // 5. Optional deep sleep after the report
            if let Some(secs) = self.config.deep_sleep_secs {
                info!("Entering deep sleep for {} s", secs);
                io.platform.deep_sleep(secs);
                report.slept = true;
            }
        }

        Ok(report)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn chip_id(&self) -> u32 {
        self.chip_id
    }

    pub fn session_state(&self) -> SessionState {
        self.state.session.state()
    }

    pub fn session(&self) -> &SessionManager<'a> {
        &self.state.session
    }

    pub fn light(&self) -> &AnalogChannel {
        &self.state.light
    }

    /// Debounced level of the named binary channel.
    pub fn level(&self, name: &str) -> Option<Level> {
        self.state
            .binary
            .iter()
            .find(|ch| ch.name() == name)
            .map(BinaryChannel::level)
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

/// Hand one report to the session, absorbing delivery failures.
fn deliver(
    session: &mut SessionManager<'_>,
    now_ms: u64,
    transport: &mut impl SessionTransport,
    event: &PublishEvent<'_>,
    report: &mut TickReport,
) {
    match session.publish(now_ms, transport, event) {
        Ok(()) => report.published += 1,
        Err(Error::TransportUnavailable) => {
            debug!("{}: session down, report dropped", event.key);
            report.dropped += 1;
        }
        Err(e) => warn!("{}: report not sent: {}", event.key, e),
    }
}
