//! Debounced binary input with session timing.
//!
//! One type serves the PIR motion sensor and both door switches; each
//! instance carries its own configuration and state.
//!
//! ## Debounce rule
//!
//! A raw level that differs from the last raw level becomes the
//! *candidate*, first seen at the current time.  The candidate replaces
//! the reported level once it has been held for `settle_ms`, counting the
//! reading that first showed it as one millisecond:
//!
//! ```text
//! held = now - first_seen + 1      promote when held >= settle_ms
//! ```
//!
//! With `settle_ms = 1` every change is reported on the tick it is seen.
//! A pulse spanning fewer than `settle_ms` milliseconds is never reported.
//!
//! ## Sessions
//!
//! A rise starts a session; the matching fall reports its length.

use log::debug;

use crate::config::{BinaryChannelConfig, ChannelName};
use crate::error::{Error, Result, SensorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    fn from_raw(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Result of polling a channel once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    Rose,
    /// `session_ms` is `None` when no rise was recorded before this fall.
    Fell { session_ms: Option<u64> },
}

pub struct BinaryChannel {
    name: ChannelName,
    pin: i32,
    settle_ms: u64,
    invert: bool,
    reported: Level,
    candidate: Level,
    candidate_since_ms: u64,
    session_start_ms: Option<u64>,
}

impl BinaryChannel {
    pub fn new(cfg: &BinaryChannelConfig) -> Result<Self> {
        if cfg.settle_ms == 0 {
            return Err(Error::InvalidChannelConfig("settle time must be positive"));
        }
        Ok(Self {
            name: cfg.name.clone(),
            pin: cfg.pin,
            settle_ms: cfg.settle_ms,
            invert: cfg.invert,
            reported: Level::Low,
            candidate: Level::Low,
            candidate_since_ms: 0,
            session_start_ms: None,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    /// Last reported (debounced) level.
    pub fn level(&self) -> Level {
        self.reported
    }

    /// Read the input once and report a debounced transition, if any.
    ///
    /// A failed read is treated as "no new information".
    pub fn poll<F>(&mut self, read: F, now_ms: u64) -> Transition
    where
        F: FnOnce(i32) -> core::result::Result<bool, SensorError>,
    {
        let raw = match read(self.pin) {
            Ok(high) => Level::from_raw(high ^ self.invert),
            Err(e) => {
                debug!("{} (GPIO {}): {}", self.name, self.pin, e);
                return Transition::NoChange;
            }
        };

        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
        }

        if self.candidate == self.reported {
            return Transition::NoChange;
        }

        let held_ms = now_ms.saturating_sub(self.candidate_since_ms) + 1;
        if held_ms < self.settle_ms {
            return Transition::NoChange;
        }

        self.reported = self.candidate;
        match self.reported {
            Level::High => {
                self.session_start_ms = Some(now_ms);
                Transition::Rose
            }
            Level::Low => Transition::Fell {
                session_ms: self
                    .session_start_ms
                    .take()
                    .map(|start| now_ms.saturating_sub(start)),
            },
        }
    }
}
