//! GPIO / peripheral pin assignments for the sensor node board.
//!
//! Single source of truth: the default configuration and the hardware
//! initialisation both reference this module rather than hard-coding pin
//! numbers.

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// LDR light sensor: voltage divider to ADC1 channel 4 (GPIO 5 on ESP32-S3).
pub const LIGHT_ADC_GPIO: i32 = 5;
/// ADC1 channel number for [`LIGHT_ADC_GPIO`].
pub const LIGHT_ADC_CHANNEL: u32 = 4;

// ---------------------------------------------------------------------------
// Sensors: digital
// ---------------------------------------------------------------------------

/// HC-SR501 PIR motion sensor output. HIGH = motion.
pub const MOTION_GPIO: i32 = 6;
/// Door reed switch (men's room). HIGH = door locked.
pub const SWITCH_GPIO: i32 = 7;
/// Door reed switch (women's room). HIGH = door locked.
pub const SWITCH_WOMEN_GPIO: i32 = 8;
