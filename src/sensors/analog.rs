//! Rate-limited moving-average sampler for a noisy analog input (LDR).
//!
//! Each tick the node offers the channel a chance to sample; readings are
//! only taken when strictly more than `min_interval_ms` has passed since
//! the previous one.  Readings land in a fixed ring buffer and are averaged
//! on demand when the periodic report is due.
//!
//! ## Unset slots
//!
//! The average only counts slots holding a value strictly greater than
//! zero.  That skips slots not yet written after boot, but it also skips a
//! genuine reading of zero (complete darkness on a 12-bit ADC).  The two
//! cases are indistinguishable here.

use log::debug;

use crate::config::AnalogChannelConfig;
use crate::error::{Error, Result, SensorError};

/// Hard upper bound on the ring buffer size.
pub const MAX_SAMPLES: usize = 64;

pub struct AnalogChannel {
    pin: i32,
    samples: heapless::Vec<f32, MAX_SAMPLES>,
    cursor: usize,
    min_interval_ms: u64,
    last_sample_ms: u64,
}

impl AnalogChannel {
    pub fn new(cfg: &AnalogChannelConfig) -> Result<Self> {
        if cfg.capacity == 0 {
            return Err(Error::InvalidChannelConfig("sample capacity must be non-zero"));
        }
        if cfg.min_interval_ms == 0 {
            return Err(Error::InvalidChannelConfig("sample interval must be positive"));
        }
        let mut samples = heapless::Vec::new();
        samples
            .resize(cfg.capacity, 0.0)
            .map_err(|()| Error::InvalidChannelConfig("sample capacity exceeds buffer"))?;

        Ok(Self {
            pin: cfg.pin,
            samples,
            cursor: 0,
            min_interval_ms: cfg.min_interval_ms,
            last_sample_ms: 0,
        })
    }

    pub fn pin(&self) -> i32 {
        self.pin
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Take a reading if the rate gate is open.
    ///
    /// `read` is invoked at most once, and only when a sample is due.  A
    /// failed read still closes the gate; the slot under the cursor keeps
    /// its previous value.  Returns `true` when a read was attempted.
    pub fn sample<F>(&mut self, read: F, now_ms: u64) -> bool
    where
        F: FnOnce(i32) -> core::result::Result<f32, SensorError>,
    {
        if now_ms.saturating_sub(self.last_sample_ms) <= self.min_interval_ms {
            return false;
        }
        self.last_sample_ms = now_ms;

        match read(self.pin) {
            Ok(value) => {
                self.samples[self.cursor] = value;
                self.cursor = (self.cursor + 1) % self.samples.len();
            }
            Err(e) => debug!("analog GPIO {}: {}", self.pin, e),
        }
        true
    }

    /// Mean of every slot holding a positive reading.
    pub fn average(&self) -> Result<f32> {
        let (sum, count) = self
            .samples
            .iter()
            .filter(|v| **v > 0.0)
            .fold((0.0_f32, 0_u32), |(sum, n), v| (sum + v, n + 1));

        if count == 0 {
            return Err(Error::NoSamples);
        }
        Ok(sum / count as f32)
    }
}
