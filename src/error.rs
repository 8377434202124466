//! Unified error types for the sensor node firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the main
//! loop handles failures uniformly. All variants are `Copy` so they can be
//! returned from the per-tick path without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An analog aggregate was requested but no buffer slot holds a
    /// positive reading.
    NoSamples,
    /// A publish was attempted while the broker session is down.  The
    /// message is dropped, never queued.
    TransportUnavailable,
    /// The broker session could not be re-established within the reconnect
    /// watchdog window.  A process restart has been requested.
    ReconnectExhausted,
    /// A channel was configured with a zero capacity or interval.
    InvalidChannelConfig(&'static str),
    /// A raw sensor read failed.
    Sensor(SensorError),
    /// Network link configuration was rejected.
    Connectivity(ConnectivityError),
    /// Configuration could not be parsed.
    Config(&'static str),
    /// An outbound message could not be serialised.
    Encoding,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSamples => write!(f, "no samples available"),
            Self::TransportUnavailable => write!(f, "transport unavailable"),
            Self::ReconnectExhausted => write!(f, "reconnect watchdog expired"),
            Self::InvalidChannelConfig(msg) => write!(f, "invalid channel config: {msg}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Connectivity(e) => write!(f, "connectivity: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Encoding => write!(f, "payload encoding failed"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// GPIO read returned an error.
    GpioReadFailed,
    /// No driver is bound to the requested pin.
    UnknownPin(i32),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::UnknownPin(pin) => write!(f, "no input bound to GPIO {pin}"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
