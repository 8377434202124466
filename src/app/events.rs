//! Outbound application messages.
//!
//! The [`Node`](super::service::Node) builds these each tick and hands them
//! straight to the session manager.  They borrow from the channel that
//! produced them and are never stored.

use core::net::Ipv4Addr;

use super::ports::ResetReason;

/// Value carried by a sensor report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Binary channel level; encoded as `1` / `0`.
    Level(bool),
    /// Aggregated analog reading.
    Number(f32),
}

/// A single sensor report: `{ <key>: value, <key>SessionLength: ms }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishEvent<'a> {
    pub key: &'a str,
    pub value: Value,
    pub session_ms: Option<u64>,
}

impl<'a> PublishEvent<'a> {
    pub fn level(key: &'a str, high: bool) -> Self {
        Self {
            key,
            value: Value::Level(high),
            session_ms: None,
        }
    }

    pub fn fall(key: &'a str, session_ms: Option<u64>) -> Self {
        Self {
            key,
            value: Value::Level(false),
            session_ms,
        }
    }

    pub fn number(key: &'a str, value: f32) -> Self {
        Self {
            key,
            value: Value::Number(value),
            session_ms: None,
        }
    }
}

/// Everything announced once per successful broker handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerInfo<'a> {
    pub chip_id: u32,
    pub free_heap: u32,
    pub ip: Option<Ipv4Addr>,
    pub ssid: &'a str,
    pub software: &'a str,
    /// Length of the outage that preceded this session.
    pub offline_ms: u64,
    pub reset_reason: ResetReason,
}
