//! Chip-level services: restart, deep sleep, heap and reset reason.
//!
//! - **`target_os = "espidf"`**: ESP-IDF system calls; `restart` and
//!   `deep_sleep` do not return.
//! - **all other targets**: records the requests so tests can assert on
//!   them.

use log::{info, warn};

use crate::app::ports::{PlatformPort, ResetReason};

#[derive(Default)]
pub struct EspPlatform {
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
    #[cfg(not(target_os = "espidf"))]
    last_sleep_secs: Option<u32>,
}

impl EspPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation: number of restarts requested.
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Simulation: duration of the last deep-sleep request.
    #[cfg(not(target_os = "espidf"))]
    pub fn last_sleep_secs(&self) -> Option<u32> {
        self.last_sleep_secs
    }
}

#[cfg(target_os = "espidf")]
impl PlatformPort for EspPlatform {
    fn restart(&mut self) {
        warn!("Platform: restarting");
        // SAFETY: esp_restart has no preconditions and never returns.
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    fn deep_sleep(&mut self, secs: u32) {
        info!("Platform: deep sleep {} s", secs);
        // SAFETY: wakes through a full reset; no state survives.
        unsafe { esp_idf_svc::sys::esp_deep_sleep(u64::from(secs) * 1_000_000) };
    }

    fn free_heap(&self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[allow(non_upper_case_globals)]
    fn reset_reason(&self) -> ResetReason {
        use esp_idf_svc::sys::*;

        match unsafe { esp_reset_reason() } {
            esp_reset_reason_t_ESP_RST_POWERON => ResetReason::PowerOn,
            esp_reset_reason_t_ESP_RST_EXT => ResetReason::External,
            esp_reset_reason_t_ESP_RST_SW => ResetReason::Software,
            esp_reset_reason_t_ESP_RST_PANIC => ResetReason::Panic,
            esp_reset_reason_t_ESP_RST_TASK_WDT => ResetReason::TaskWatchdog,
            esp_reset_reason_t_ESP_RST_INT_WDT | esp_reset_reason_t_ESP_RST_WDT => {
                ResetReason::OtherWatchdog
            }
            esp_reset_reason_t_ESP_RST_DEEPSLEEP => ResetReason::DeepSleepWake,
            esp_reset_reason_t_ESP_RST_BROWNOUT => ResetReason::Brownout,
            _ => ResetReason::Unknown,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl PlatformPort for EspPlatform {
    fn restart(&mut self) {
        warn!("Platform(sim): restart requested");
        self.restarts += 1;
    }

    fn deep_sleep(&mut self, secs: u32) {
        info!("Platform(sim): deep sleep {} s", secs);
        self.last_sleep_secs = Some(secs);
    }

    fn free_heap(&self) -> u32 {
        256 * 1024
    }

    fn reset_reason(&self) -> ResetReason {
        ResetReason::PowerOn
    }
}
