//! Hardware adapter: bridges real peripherals to the [`SensorPort`].
//!
//! Digital inputs are any `embedded_hal` [`InputPin`] (on target, an
//! `esp-idf-hal` `PinDriver`), bound to the GPIO number the channels are
//! configured with.  The light sensor goes through the oneshot ADC in
//! [`hw_init`](crate::drivers::hw_init).  This is the only module in the
//! system that touches actual sensor hardware; on non-espidf targets the
//! analog path reads a settable simulated value.

use embedded_hal::digital::InputPin;

use crate::app::ports::SensorPort;
use crate::config::MAX_BINARY_CHANNELS;
use crate::error::{Error, Result, SensorError};

pub struct HardwareAdapter<I: InputPin> {
    light_pin: i32,
    light_adc_channel: u32,
    inputs: heapless::Vec<(i32, I), MAX_BINARY_CHANNELS>,
    #[cfg(not(target_os = "espidf"))]
    sim_light: f32,
}

impl<I: InputPin> HardwareAdapter<I> {
    pub fn new(light_pin: i32, light_adc_channel: u32) -> Self {
        Self {
            light_pin,
            light_adc_channel,
            inputs: heapless::Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_light: 0.0,
        }
    }

    /// Attach an input driver to a GPIO number.
    pub fn bind_input(&mut self, pin: i32, input: I) -> Result<()> {
        if self.inputs.iter().any(|(p, _)| *p == pin) {
            return Err(Error::InvalidChannelConfig("GPIO bound twice"));
        }
        self.inputs
            .push((pin, input))
            .map_err(|_| Error::InvalidChannelConfig("too many digital inputs"))
    }

    pub fn bound_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn adc_channel(&self) -> u32 {
        self.light_adc_channel
    }

    /// Simulation: value returned by the next analog reads.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_light(&mut self, raw: f32) {
        self.sim_light = raw;
    }

    #[cfg(target_os = "espidf")]
    fn read_light(&mut self) -> core::result::Result<f32, SensorError> {
        crate::drivers::hw_init::adc1_read(self.light_adc_channel)
            .map(f32::from)
            .map_err(|e| {
                log::debug!("light: {}", e);
                SensorError::AdcReadFailed
            })
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_light(&mut self) -> core::result::Result<f32, SensorError> {
        Ok(self.sim_light)
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I: InputPin> SensorPort for HardwareAdapter<I> {
    fn read_analog(&mut self, pin: i32) -> core::result::Result<f32, SensorError> {
        if pin != self.light_pin {
            return Err(SensorError::UnknownPin(pin));
        }
        self.read_light()
    }

    fn read_digital(&mut self, pin: i32) -> core::result::Result<bool, SensorError> {
        let (_, input) = self
            .inputs
            .iter_mut()
            .find(|(p, _)| *p == pin)
            .ok_or(SensorError::UnknownPin(pin))?;
        input.is_high().map_err(|_| SensorError::GpioReadFailed)
    }
}
