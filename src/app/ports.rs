//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Node (domain)
//! ```
//!
//! Driven adapters (GPIO/ADC, MQTT client, chip services) implement these
//! traits.  The [`Node`](super::service::Node) consumes them via generics,
//! so the domain core never touches hardware or sockets directly.

use core::fmt;

use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw, undebounced reads of a single pin.
pub trait SensorPort {
    fn read_analog(&mut self, pin: i32) -> Result<f32, SensorError>;

    /// `true` = pin level HIGH.
    fn read_digital(&mut self, pin: i32) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Session transport (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Broker session client.
///
/// Every call is expected to return promptly; the session manager never
/// blocks waiting on it.
pub trait SessionTransport {
    /// Attempt a session handshake.  `true` on success.
    fn connect(&mut self, client_id: &str) -> bool;

    fn is_connected(&self) -> bool;

    fn subscribe(&mut self, topic: &str) -> bool;

    /// Fire-and-forget publish.  `false` means the session failed.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;

    /// Housekeeping: keep-alives and delivery of inbound messages.
    fn poll(&mut self, on_message: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Platform port (driven adapter: domain → chip services)
// ───────────────────────────────────────────────────────────────

/// Chip-level services the node needs: identity metrics and power control.
pub trait PlatformPort {
    /// Restart the whole device.  On hardware this does not return.
    fn restart(&mut self);

    /// Enter deep sleep for `secs`.  On hardware this does not return.
    fn deep_sleep(&mut self, secs: u32);

    fn free_heap(&self) -> u32;

    fn reset_reason(&self) -> ResetReason;
}

/// Why the chip last booted, as reported in the controller info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    PowerOn,
    External,
    Software,
    Panic,
    TaskWatchdog,
    OtherWatchdog,
    DeepSleepWake,
    Brownout,
    Unknown,
}

impl ResetReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PowerOn => "Power on",
            Self::External => "External System",
            Self::Software => "Software/System restart",
            Self::Panic => "Exception",
            Self::TaskWatchdog => "Software Watchdog",
            Self::OtherWatchdog => "Hardware Watchdog",
            Self::DeepSleepWake => "Deep-Sleep Wake",
            Self::Brownout => "Brownout",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
